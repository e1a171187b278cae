//! Integration tests for query parsing against indexed documents.

use quill_index::{DefaultOperator, IndexConfig, SearchOptions, Value};

use crate::common::{TestHarness, person};

fn seeded(config: IndexConfig) -> TestHarness {
    let harness = TestHarness::with_config(config);
    harness.index_all(&[
        person(1, "John Doe", "2020-03-15", "Berlin"),
        person(2, "Jane Doe", "2019-12-31", "Hamburg").with("bio", "Loves running marathons"),
        person(3, "John Smith", "2021-01-01", "Munich").with("nickname", "2020-06-01"),
    ]);
    harness
}

fn keys(harness: &TestHarness, expression: &str) -> Vec<String> {
    harness
        .db
        .search(expression, &SearchOptions::default())
        .unwrap()
        .iter()
        .map(|hit| hit.unique_key().to_string())
        .collect()
}

fn sorted_keys(harness: &TestHarness, expression: &str) -> Vec<String> {
    let mut keys = keys(harness, expression);
    keys.sort();
    keys
}

#[test]
fn test_blank_expression_has_no_results() {
    let harness = seeded(IndexConfig::default());
    assert!(harness.db.parser().unwrap().parse(" \t ").unwrap().is_none());
    assert!(keys(&harness, "   ").is_empty());
}

#[test]
fn test_free_text_and_field_search() {
    let harness = seeded(IndexConfig::default());
    assert_eq!(sorted_keys(&harness, "john"), vec!["Person-1", "Person-3"]);
    assert_eq!(keys(&harness, "name:jane"), vec!["Person-2"]);
    assert_eq!(keys(&harness, "city:munich"), vec!["Person-3"]);
    assert_eq!(keys(&harness, "bio:marathons"), vec!["Person-2"]);
}

#[test]
fn test_default_operator() {
    let harness = seeded(IndexConfig::default());
    assert_eq!(keys(&harness, "john doe"), vec!["Person-1"]);

    let harness = seeded(IndexConfig {
        default_operator: DefaultOperator::Or,
        ..Default::default()
    });
    assert_eq!(harness.db.search("john doe", &SearchOptions::default()).unwrap().hits(), 3);
}

#[test]
fn test_boolean_operators() {
    let harness = seeded(IndexConfig::default());
    assert_eq!(
        sorted_keys(&harness, "jane OR smith"),
        vec!["Person-2", "Person-3"]
    );
    assert_eq!(keys(&harness, "doe NOT jane"), vec!["Person-1"]);
    assert_eq!(keys(&harness, "(berlin OR munich) -smith"), vec!["Person-1"]);
}

#[test]
fn test_date_range_on_date_field() {
    let harness = seeded(IndexConfig::default());
    assert_eq!(
        keys(&harness, "born_on:2020-01-01..2020-12-31"),
        vec!["Person-1"]
    );
    assert_eq!(
        sorted_keys(&harness, "born_on:2020-01-01.."),
        vec!["Person-1", "Person-3"]
    );
    assert_eq!(keys(&harness, "born_on:..2019-12-31"), vec!["Person-2"]);
}

#[test]
fn test_range_syntax_on_generic_field_is_not_a_range() {
    let harness = seeded(IndexConfig::default());
    // Person-3's nickname lies inside the range but the field is untyped.
    assert!(keys(&harness, "nickname:2020-01-01..2020-12-31").is_empty());
}

#[test]
fn test_string_range() {
    let harness = seeded(IndexConfig::default());
    assert_eq!(
        sorted_keys(&harness, "city:Berlin..Hamburg"),
        vec!["Person-1", "Person-2"]
    );
}

#[test]
fn test_wildcard() {
    let harness = seeded(IndexConfig::default());
    assert_eq!(sorted_keys(&harness, "ja*"), vec!["Person-2"]);
    assert_eq!(
        sorted_keys(&harness, "name:jo*"),
        vec!["Person-1", "Person-3"]
    );
}

#[test]
fn test_phrase() {
    let harness = seeded(IndexConfig::default());
    assert_eq!(keys(&harness, "\"john smith\""), vec!["Person-3"]);
}

#[test]
fn test_stemming_and_stopwords() {
    let harness = seeded(IndexConfig::default().with_language("en"));
    assert_eq!(keys(&harness, "run"), vec!["Person-2"]);
    assert_eq!(keys(&harness, "the marathon"), vec!["Person-2"]);
}

#[test]
fn test_spelling_suggestion() {
    let harness = seeded(IndexConfig::default().with_language("en"));
    let results = harness
        .db
        .search("marathonz", &SearchOptions::default())
        .unwrap();
    assert_eq!(results.hits(), 0);
    assert_eq!(results.spelling_suggestion(), Some("marathons"));

    let results = harness.db.search("john", &SearchOptions::default()).unwrap();
    assert_eq!(results.spelling_suggestion(), None);
}

#[test]
fn test_class_scoped_search() {
    let harness = seeded(IndexConfig::default());
    let results = harness
        .db
        .search_class("Person", "", &SearchOptions::default())
        .unwrap();
    assert_eq!(results.hits(), 3);

    let results = harness
        .db
        .search("doe indexed_class:Person", &SearchOptions::default())
        .unwrap();
    assert_eq!(results.hits(), 2);
}

#[test]
fn test_sort_by_attribute() {
    let harness = seeded(IndexConfig::default());
    let options = SearchOptions {
        order: vec!["born_on".to_string()],
        ..Default::default()
    };
    let keys: Vec<_> = harness
        .db
        .search_class("Person", "", &options)
        .unwrap()
        .iter()
        .map(|hit| hit.unique_key().to_string())
        .collect();
    assert_eq!(keys, vec!["Person-2", "Person-1", "Person-3"]);
}

#[test]
fn test_facets() {
    let harness = seeded(IndexConfig::default());
    let facets = harness.db.facets("city", "doe").unwrap();
    let values: Vec<_> = facets.iter().map(|f| (f.value.clone(), f.count)).collect();
    assert_eq!(
        values,
        vec![(Value::from("Berlin"), 1), (Value::from("Hamburg"), 1)]
    );
}
