//! Object to document conversion.
//!
//! The [`Indexer`] turns an [`Indexable`] into a [`Document`] according to
//! its class's blueprint:
//!
//! - `data` is the unique key
//! - slot 0 holds the class name, attribute slots hold codec-encoded values
//! - boolean terms mark the class and the unique key
//! - every indexed method contributes weighted terms, both field-qualified
//!   (`X<FIELD>word`) and unqualified, plus stemmed forms (`Z...`) when a
//!   language is configured
//!
//! # Usage
//!
//! ```rust
//! use quill_index::{AttributeOptions, BlueprintRegistry, Indexer, MapRecord};
//!
//! let registry = BlueprintRegistry::new();
//! registry
//!     .setup("Person", |bp| {
//!         bp.attribute("name", AttributeOptions::default().weight(2))?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let indexer = Indexer::new(registry.snapshot());
//! let person = MapRecord::new("Person", "1").with("name", "John Doe");
//! let doc = indexer.build_document_for(&person, "Person-1").unwrap();
//!
//! assert_eq!(doc.get_value(0), "Person");
//! assert_eq!(doc.wdf("XNAMEjohn"), 2);
//! ```

use std::sync::Arc;

use quill_core::util::terms::STEM_PREFIX;
use quill_core::{Result, Value, class_term, field_prefix, unique_term};

use crate::adapter::Indexable;
use crate::document::Document;
use crate::registry::RegistrySnapshot;
use crate::stemming::{Stemming, words};

/// Builds documents from objects.
#[derive(Debug, Clone)]
pub struct Indexer {
    registry: Arc<RegistrySnapshot>,
    stemming: Option<Arc<Stemming>>,
    term_min_length: usize,
}

impl Indexer {
    /// Create an indexer over a registry snapshot, without stemming.
    pub fn new(registry: Arc<RegistrySnapshot>) -> Self {
        Self {
            registry,
            stemming: None,
            term_min_length: 1,
        }
    }

    /// Emit stemmed terms with this language.
    pub fn with_stemming(mut self, stemming: Option<Arc<Stemming>>) -> Self {
        self.stemming = stemming;
        self
    }

    /// Skip words shorter than `length` characters.
    pub fn with_term_min_length(mut self, length: usize) -> Self {
        self.term_min_length = length;
        self
    }

    /// Build the document for `object`.
    ///
    /// # Errors
    ///
    /// - [`BlueprintNotFound`](quill_core::Error::BlueprintNotFound) if the
    ///   class (and its ancestors) has no blueprint
    /// - value or type errors from codecs and field access
    pub fn build_document_for(&self, object: &dyn Indexable, unique_key: &str) -> Result<Document> {
        let class = object.class_name();
        let blueprint = self.registry.blueprint_for(class)?;
        let accessors = self.registry.accessors_for(class)?;

        let mut doc = Document::new();
        doc.set_data(unique_key);
        doc.set_value(0, class);

        for attribute in blueprint.attribute_list() {
            let Some(accessor) = accessors.accessor(attribute.name()) else {
                continue;
            };
            let value = attribute.value_of(object)?;
            let codec = self.registry.codec_for(accessor.type_tag())?;
            doc.set_value(accessor.slot(), codec.encode(&value)?);
        }

        doc.add_boolean_term(class_term(class));
        doc.add_boolean_term(unique_term(unique_key));

        for method in blueprint.indexed_methods() {
            let value = method.value_of(object)?;
            let prefix = field_prefix(method.name());
            for text in texts(&value) {
                self.index_text(&mut doc, &text, method.weight(), &prefix);
                self.index_text(&mut doc, &text, method.weight(), "");
            }
        }

        log::debug!(
            "built document '{unique_key}' with {} terms",
            doc.term_count()
        );
        Ok(doc)
    }

    fn index_text(&self, doc: &mut Document, text: &str, weight: u32, prefix: &str) {
        let long_enough = |word: &str| word.chars().count() >= self.term_min_length;
        for word in words(text) {
            if long_enough(word.text) {
                doc.add_term(weight, &word.term, Some(prefix));
            }
        }
        if let Some(stemming) = &self.stemming {
            let stem_prefix = format!("{STEM_PREFIX}{prefix}");
            for word in stemming.stemmed_words(text) {
                if long_enough(word.text) {
                    doc.add_term(weight, &word.term, Some(&stem_prefix));
                }
            }
        }
    }
}

/// Text forms of a value, lists element-wise, nulls skipped.
fn texts(value: &Value) -> Vec<String> {
    match value {
        Value::List(items) => items.iter().flat_map(texts).collect(),
        other => other.to_text().into_iter().collect(),
    }
}

// ============================================================================
// Tests
// ============================================================================
