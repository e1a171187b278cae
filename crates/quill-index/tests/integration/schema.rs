//! Integration tests for blueprint registration and slot assignment.

use std::sync::Arc;

use quill_core::BigDecimal;
use quill_index::{
    AttributeOptions, BlueprintRegistry, Database, Error, IndexConfig, IndexWriter, MapRecord,
    TypeTag, Value,
};

use crate::common::{TestHarness, person};

#[test]
fn test_global_slots_follow_sorted_attribute_names() {
    let registry = BlueprintRegistry::new();
    registry
        .setup("A", |bp| {
            bp.attributes(&["a", "z"])?;
            Ok(())
        })
        .unwrap();
    registry
        .setup("B", |bp| {
            bp.attributes(&["b"])?;
            Ok(())
        })
        .unwrap();

    assert_eq!(registry.attributes(), vec!["a", "b", "z"]);
    assert_eq!(registry.value_slot_for("indexed_class").unwrap(), 0);
    assert_eq!(registry.value_slot_for("a").unwrap(), 1);
    assert_eq!(registry.value_slot_for("b").unwrap(), 2);
    assert_eq!(registry.value_slot_for("z").unwrap(), 3);
}

#[test]
fn test_documents_use_global_slots() {
    let registry = Arc::new(BlueprintRegistry::new());
    registry
        .setup("A", |bp| {
            bp.attributes(&["a", "z"])?;
            Ok(())
        })
        .unwrap();
    registry
        .setup("B", |bp| {
            bp.attributes(&["b"])?;
            Ok(())
        })
        .unwrap();
    let db = Database::in_memory(registry, IndexConfig::default()).unwrap();

    let record = MapRecord::new("A", "1").with("a", "first").with("z", "last");
    let doc = db.indexer().build_document_for(&record, "A-1").unwrap();

    assert_eq!(doc.get_value(0), "A");
    assert_eq!(doc.get_value(1), "first");
    assert_eq!(doc.get_value(2), "");
    assert_eq!(doc.get_value(3), "last");
}

#[test]
fn test_conflicting_attribute_types_rejected() {
    let registry = BlueprintRegistry::new();
    registry
        .setup("Person", |bp| {
            bp.attribute("age", AttributeOptions::typed(TypeTag::Number))?;
            Ok(())
        })
        .unwrap();

    let err = registry
        .setup("Dog", |bp| {
            bp.attribute("age", AttributeOptions::typed(TypeTag::String))?;
            Ok(())
        })
        .unwrap_err();

    assert!(matches!(err, Error::AmbiguousType { .. }));
    assert!(err.is_configuration_error());
    assert!(registry.blueprint_for("Dog").is_err());
}

#[test]
fn test_reserved_attribute_name_rejected() {
    let registry = BlueprintRegistry::new();
    let err = registry
        .setup("Person", |bp| {
            bp.attribute("score", AttributeOptions::default())?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, Error::ReservedName { .. }));
}

#[test]
fn test_hits_decode_typed_attributes() {
    let harness = TestHarness::new();
    harness.index_all(&[person(1, "John Doe", "1980-05-17", "Berlin")]);

    let results = harness.db.search("john", &Default::default()).unwrap();
    let hit = &results.items()[0];

    assert_eq!(hit.indexed_class(), "Person");
    assert_eq!(hit.unique_key(), "Person-1");
    assert_eq!(hit.get("name").unwrap(), Value::from("John Doe"));
    assert_eq!(hit.get("city").unwrap(), Value::from("Berlin"));
    assert_eq!(
        hit.get("born_on").unwrap().as_date(),
        "1980-05-17".parse().ok()
    );
    assert_eq!(
        hit.get("age").unwrap(),
        Value::Decimal(BigDecimal::from(30))
    );
    assert!(hit.get("shoe_size").is_err());

    let attributes = hit.attributes().unwrap();
    assert_eq!(attributes.len(), 5);
}

#[test]
fn test_stored_only_attribute_not_searchable() {
    let harness = TestHarness::new();
    harness.index_all(&[person(1, "John Doe", "1980-05-17", "Berlin")]);

    let results = harness.db.search("30", &Default::default()).unwrap();
    assert_eq!(results.hits(), 0);

    assert!(!harness.registry.searchable_prefixes().contains("age"));
    let results = harness.db.search("age:20..40", &Default::default()).unwrap();
    assert_eq!(results.hits(), 0);
}

#[test]
fn test_indexed_number_attribute_supports_ranges() {
    let registry = Arc::new(BlueprintRegistry::new());
    registry
        .setup("Invoice", |bp| {
            bp.attribute("total", AttributeOptions::typed(TypeTag::Number))?;
            Ok(())
        })
        .unwrap();
    let db = Database::in_memory(registry, IndexConfig::default()).unwrap();
    let writer = db.writer().unwrap();
    for (id, total) in [("1", "9007199254740992"), ("2", "9007199254740993"), ("3", "0.1")] {
        let total: BigDecimal = total.parse().unwrap();
        writer
            .index(&MapRecord::new("Invoice", id).with("total", total))
            .unwrap();
    }

    let results = db
        .search("total:9007199254740993..", &Default::default())
        .unwrap();
    assert_eq!(results.hits(), 1);
    assert_eq!(results.items()[0].unique_key(), "Invoice-2");

    let results = db.search("total:..0.1", &Default::default()).unwrap();
    assert_eq!(results.hits(), 1);
    assert_eq!(
        results.items()[0].get("total").unwrap(),
        Value::Decimal("0.1".parse().unwrap())
    );
}

#[test]
fn test_reregistration_replaces_blueprint() {
    let harness = TestHarness::new();
    harness
        .registry
        .setup("Person", |bp| {
            bp.attribute("name", AttributeOptions::default())?;
            Ok(())
        })
        .unwrap();

    assert_eq!(harness.registry.attributes(), vec!["name"]);
    let writer = harness.db.writer().unwrap();
    writer
        .index(&MapRecord::new("Person", "1").with("name", "John"))
        .unwrap();
    assert_eq!(harness.db.size().unwrap(), 1);
}
