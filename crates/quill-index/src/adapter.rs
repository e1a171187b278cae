//! Domain objects and adapters.
//!
//! [`Indexable`] is everything the indexer needs from an application object:
//! its class, its id, and named field access. An [`Adapter`] decides how
//! those objects are keyed in the index and is told about every class that
//! gets a blueprint.
//!
//! # Example
//!
//! ```rust
//! use quill_index::{GenericAdapter, Adapter, MapRecord};
//!
//! let person = MapRecord::new("Person", "1").with("name", "Ada");
//! assert_eq!(GenericAdapter.unique_key(&person), "Person-1");
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use quill_core::{Error, Result, Value, unique_key};

use crate::blueprint::Blueprint;
use crate::types::IndexConfig;

/// An application object that can be mapped onto an index document.
pub trait Indexable {
    /// Name of the object's class, used for blueprint lookup.
    fn class_name(&self) -> &str;

    /// The object's primary key within its class.
    fn id(&self) -> String;

    /// Read a field by name.
    ///
    /// Returns `None` if the object has no such field, `Some(Value::Null)`
    /// if the field exists but is empty.
    fn field(&self, name: &str) -> Option<Value>;
}

/// Connects a class of objects to the index.
pub trait Adapter: Send + Sync {
    /// Adapter name for diagnostics.
    fn name(&self) -> &str;

    /// The unique key stored with the object's document.
    fn unique_key(&self, object: &dyn Indexable) -> String;

    /// Called whenever a blueprint is (re)registered for `class`.
    fn attach(&self, class: &str, blueprint: &Blueprint) -> Result<()> {
        let _ = (class, blueprint);
        Ok(())
    }
}

/// Adapter keying documents as `<Class>-<id>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericAdapter;

impl Adapter for GenericAdapter {
    fn name(&self) -> &str {
        "generic"
    }

    fn unique_key(&self, object: &dyn Indexable) -> String {
        unique_key(object.class_name(), &object.id())
    }

    fn attach(&self, class: &str, blueprint: &Blueprint) -> Result<()> {
        log::debug!(
            "generic adapter attached to '{class}' ({} attributes, {} indexed methods)",
            blueprint.attribute_names().len(),
            blueprint.indexed_method_names().len()
        );
        Ok(())
    }
}

/// Resolve the adapter named in the configuration.
///
/// # Errors
///
/// Returns a configuration error for unknown adapter names.
pub fn create_adapter(config: &IndexConfig) -> Result<Arc<dyn Adapter>> {
    match config.adapter.as_str() {
        "generic" => Ok(Arc::new(GenericAdapter)),
        other => Err(Error::config(format!("unknown adapter '{other}'"))),
    }
}

/// An [`Indexable`] backed by a plain field map.
///
/// Useful for tests and for data that never had a dedicated struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapRecord {
    class: String,
    id: String,
    fields: BTreeMap<String, Value>,
}

impl MapRecord {
    /// Create an empty record.
    pub fn new(class: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field, consuming and returning the record.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set a field in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }
}

impl Indexable for MapRecord {
    fn class_name(&self) -> &str {
        &self.class
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }
}

// ============================================================================
// Tests
// ============================================================================
