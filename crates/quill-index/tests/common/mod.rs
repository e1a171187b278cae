//! Common test utilities and harness for quill-index integration tests.

use std::sync::Arc;

use chrono::NaiveDate;
use quill_index::{
    AttributeOptions, BlueprintRegistry, Database, IndexConfig, IndexOptions, IndexWriter,
    MapRecord, TypeTag, Value,
};

/// Test harness for integration tests.
///
/// Holds a registry with a `Person` blueprint and an in-memory database
/// over it.
pub struct TestHarness {
    /// Shared blueprint registry
    pub registry: Arc<BlueprintRegistry>,
    /// Database under test
    pub db: Database,
}

impl TestHarness {
    /// Creates a harness with the default configuration.
    pub fn new() -> Self {
        Self::with_config(IndexConfig::default())
    }

    /// Creates a harness with a custom configuration.
    pub fn with_config(config: IndexConfig) -> Self {
        let registry = people_registry();
        let db = Database::in_memory(Arc::clone(&registry), config)
            .expect("database should open");
        Self { registry, db }
    }

    /// Index every record with the configured writer.
    pub fn index_all(&self, records: &[MapRecord]) {
        let writer = self.db.writer().expect("writer should be created");
        for record in records {
            writer.index(record).expect("record should index");
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A registry with `Person`:
///
/// - `name` (generic, weight 2)
/// - `born_on` (date)
/// - `age` (number, stored only)
/// - `city` (string)
/// - `nickname` (generic)
/// - `bio` (indexed only)
pub fn people_registry() -> Arc<BlueprintRegistry> {
    let registry = Arc::new(BlueprintRegistry::new());
    registry
        .setup("Person", |bp| {
            bp.attribute("name", AttributeOptions::default().weight(2))?
                .attribute("born_on", AttributeOptions::typed(TypeTag::Date))?
                .attribute("age", AttributeOptions::typed(TypeTag::Number).index(false))?
                .attribute("city", AttributeOptions::typed(TypeTag::String))?
                .attribute("nickname", AttributeOptions::default())?
                .index("bio", IndexOptions::default())
                .ignore_if(|person| person.field("city").is_none_or(|city| city.is_null()));
            Ok(())
        })
        .expect("Person blueprint should register");
    registry
}

/// Helper to create a person record.
pub fn person(id: u32, name: &str, born_on: &str, city: &str) -> MapRecord {
    let born_on = born_on
        .parse::<NaiveDate>()
        .expect("test dates are well formed");
    MapRecord::new("Person", id.to_string())
        .with("name", name)
        .with("born_on", born_on)
        .with("age", 30)
        .with("city", city)
        .with("nickname", Value::Null)
        .with("bio", Value::Null)
}

/// `count` people all named Smith, born on consecutive days of 2000.
pub fn smiths(count: u32) -> Vec<MapRecord> {
    (1..=count)
        .map(|i| {
            let born_on = NaiveDate::from_ymd_opt(2000, 1, 1)
                .and_then(|d| d.checked_add_days(chrono::Days::new(u64::from(i))))
                .expect("dates within 2000");
            person(i, &format!("Agent Smith {i}"), &born_on.to_string(), "Matrix")
        })
        .collect()
}
