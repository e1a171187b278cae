//! Integration tests for result paging.

use quill_index::{Error, SearchOptions};

use crate::common::{TestHarness, smiths};

fn harness_with_25_smiths() -> TestHarness {
    let harness = TestHarness::new();
    harness.index_all(&smiths(25));
    harness
}

fn page(harness: &TestHarness, page: usize) -> quill_index::Result<quill_index::Resultset> {
    harness.db.search(
        "smith",
        &SearchOptions {
            page: Some(page),
            per_page: Some(10),
            ..Default::default()
        },
    )
}

#[test]
fn test_first_page() {
    let harness = harness_with_25_smiths();
    let results = page(&harness, 1).unwrap();

    assert_eq!(results.hits(), 25);
    assert_eq!(results.total_pages(), 3);
    assert_eq!(results.current_page(), 1);
    assert_eq!(results.len(), 10);
    assert_eq!(results.previous_page(), None);
    assert_eq!(results.next_page(), Some(2));
}

#[test]
fn test_middle_page() {
    let harness = harness_with_25_smiths();
    let results = page(&harness, 2).unwrap();
    assert_eq!(results.len(), 10);
    assert_eq!(results.previous_page(), Some(1));
    assert_eq!(results.next_page(), Some(3));
}

#[test]
fn test_last_page() {
    let harness = harness_with_25_smiths();
    let results = page(&harness, 3).unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(results.next_page(), None);
    assert_eq!(results.previous_page(), Some(2));
}

#[test]
fn test_page_out_of_range() {
    let harness = harness_with_25_smiths();
    let err = page(&harness, 4).unwrap_err();
    assert!(matches!(
        err,
        Error::PageOutOfRange {
            page: 4,
            total_pages: 3
        }
    ));
}

#[test]
fn test_pages_do_not_overlap() {
    let harness = harness_with_25_smiths();
    let mut seen: Vec<String> = (1..=3)
        .flat_map(|n| {
            page(&harness, n)
                .unwrap()
                .into_iter()
                .map(|hit| hit.unique_key().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 25);
}

#[test]
fn test_limit_bounds_the_window() {
    let harness = harness_with_25_smiths();
    let options = SearchOptions {
        limit: Some(12),
        per_page: Some(5),
        page: Some(3),
        ..Default::default()
    };
    let results = harness.db.search("smith", &options).unwrap();
    assert_eq!(results.hits(), 25);
    assert_eq!(results.total_pages(), 3);
    assert_eq!(results.len(), 2);
}

#[test]
fn test_no_matches_is_empty_not_an_error() {
    let harness = harness_with_25_smiths();
    let results = harness
        .db
        .search("neo", &SearchOptions::default())
        .unwrap();
    assert!(results.is_empty());
    assert_eq!(results.hits(), 0);
    assert_eq!(results.total_pages(), 0);
    assert_eq!(results.current_page(), 0);
    assert_eq!(results.next_page(), None);
}
