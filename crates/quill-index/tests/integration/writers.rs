//! Integration tests for write dispatch and lifecycle hooks.

use quill_index::{
    Error, IndexConfig, IndexWriter, LifecycleHooks, QueuedWriter, SearchOptions, Value,
};

use crate::common::{TestHarness, person, smiths};

fn hits(harness: &TestHarness, expression: &str) -> usize {
    harness
        .db
        .search(expression, &SearchOptions::default())
        .unwrap()
        .hits()
}

#[test]
fn test_ignored_object_is_not_searchable() {
    let harness = TestHarness::new();
    let homeless = person(1, "John Doe", "1980-01-01", "Berlin").with("city", Value::Null);
    harness.index_all(&[homeless]);

    assert_eq!(harness.db.size().unwrap(), 0);
    assert_eq!(hits(&harness, "john"), 0);
}

#[test]
fn test_object_becoming_ignored_is_removed() {
    let harness = TestHarness::new();
    let john = person(1, "John Doe", "1980-01-01", "Berlin");
    harness.index_all(&[john.clone()]);
    assert_eq!(hits(&harness, "john"), 1);

    let writer = harness.db.writer().unwrap();
    writer
        .after_update(&john.with("city", Value::Null), &["city"])
        .unwrap();
    assert_eq!(hits(&harness, "john"), 0);
}

#[test]
fn test_reindexing_replaces_instead_of_duplicating() {
    let harness = TestHarness::new();
    let john = person(1, "John Doe", "1980-01-01", "Berlin");
    harness.index_all(&[john.clone(), john.clone().with("name", "Johnny Doe")]);

    assert_eq!(harness.db.size().unwrap(), 1);
    assert_eq!(hits(&harness, "johnny"), 1);
    assert_eq!(hits(&harness, "name:john"), 0);
}

#[test]
fn test_destroy_removes_document() {
    let harness = TestHarness::new();
    let john = person(1, "John Doe", "1980-01-01", "Berlin");
    let writer = harness.db.writer().unwrap();
    writer.after_create(&john).unwrap();
    writer.after_destroy(&john).unwrap();
    assert_eq!(hits(&harness, "john"), 0);
}

#[test]
fn test_reindex_class() {
    let harness = TestHarness::new();
    harness.index_all(&smiths(5));

    let fresh = smiths(2);
    let objects: Vec<&dyn quill_index::Indexable> =
        fresh.iter().map(|r| r as &dyn quill_index::Indexable).collect();
    let stats = harness
        .db
        .writer()
        .unwrap()
        .reindex_class("Person", &objects)
        .unwrap();

    assert_eq!(stats.documents_indexed, 2);
    assert_eq!(hits(&harness, "smith"), 2);
}

#[test]
fn test_transaction_writer_rejects_reindex() {
    let harness = TestHarness::with_config(IndexConfig::default().with_writer("transactional"));
    let err = harness
        .db
        .writer()
        .unwrap()
        .reindex_class("Person", &[])
        .unwrap_err();
    assert!(matches!(err, Error::Unsupported { .. }));
}

#[test]
fn test_database_transaction() {
    let harness = TestHarness::new();
    harness
        .db
        .transaction(|tx| {
            for record in smiths(3) {
                tx.index(&record)?;
            }
            Ok(())
        })
        .unwrap();
    assert_eq!(hits(&harness, "smith"), 3);
}

#[test]
fn test_noop_writer_indexes_nothing() {
    let harness = TestHarness::with_config(IndexConfig::default().with_writer("noop"));
    harness.index_all(&smiths(3));
    assert_eq!(harness.db.size().unwrap(), 0);
}

#[tokio::test]
async fn test_queued_writer_end_to_end() {
    let harness = TestHarness::with_config(IndexConfig::default().with_writer("queued"));
    let writer = QueuedWriter::spawn(harness.db.clone()).unwrap();

    for record in smiths(4) {
        writer.after_create(&record).unwrap();
    }
    writer.flush().await.unwrap();

    assert_eq!(hits(&harness, "smith"), 4);
}
