//! Index document representation.
//!
//! A [`Document`] is what the indexer produces for one object and what the
//! engine hands back for a match:
//!
//! - `data`: the object's unique key
//! - `values`: encoded attribute strings, keyed by value slot
//! - `terms`: searchable terms with their within-document frequency
//!
//! ```rust
//! use quill_index::Document;
//!
//! let doc = Document::builder()
//!     .data("Person-1")
//!     .value(0, "Person")
//!     .term("XINDEXED_CLASSperson")
//!     .weighted_term(2, "john")
//!     .build();
//!
//! assert_eq!(doc.get_value(0), "Person");
//! assert_eq!(doc.wdf("john"), 2);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A document stored in the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    data: String,
    values: BTreeMap<u32, String>,
    terms: BTreeMap<String, u32>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new document builder.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::default()
    }

    /// The opaque payload (the unique key).
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Replace the payload.
    pub fn set_data(&mut self, data: impl Into<String>) {
        self.data = data.into();
    }

    /// Store an encoded value in `slot`.
    pub fn set_value(&mut self, slot: u32, value: impl Into<String>) {
        self.values.insert(slot, value.into());
    }

    /// Encoded value of `slot`, or `""` if the slot is empty.
    pub fn get_value(&self, slot: u32) -> &str {
        self.values.get(&slot).map(String::as_str).unwrap_or("")
    }

    /// All populated slots.
    pub fn values(&self) -> &BTreeMap<u32, String> {
        &self.values
    }

    /// Add `weight` occurrences of `prefix + text`.
    pub fn add_term(&mut self, weight: u32, text: &str, prefix: Option<&str>) {
        let term = match prefix {
            Some(prefix) => format!("{prefix}{text}"),
            None => text.to_string(),
        };
        *self.terms.entry(term).or_insert(0) += weight;
    }

    /// Add a term that only filters (zero frequency).
    pub fn add_boolean_term(&mut self, term: impl Into<String>) {
        self.terms.entry(term.into()).or_insert(0);
    }

    /// Returns `true` if the document is indexed by `term`.
    pub fn has_term(&self, term: &str) -> bool {
        self.terms.contains_key(term)
    }

    /// Within-document frequency of `term` (0 if absent).
    pub fn wdf(&self, term: &str) -> u32 {
        self.terms.get(term).copied().unwrap_or(0)
    }

    /// Iterate over `(term, wdf)` pairs in term order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, u32)> {
        self.terms.iter().map(|(term, wdf)| (term.as_str(), *wdf))
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}

/// Builder for [`Document`].
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    doc: Document,
}

impl DocumentBuilder {
    /// Set the payload.
    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.doc.set_data(data);
        self
    }

    /// Set a value slot.
    pub fn value(mut self, slot: u32, value: impl Into<String>) -> Self {
        self.doc.set_value(slot, value);
        self
    }

    /// Add a boolean term.
    pub fn term(mut self, term: impl Into<String>) -> Self {
        self.doc.add_boolean_term(term);
        self
    }

    /// Add a weighted free-text term.
    pub fn weighted_term(mut self, weight: u32, term: &str) -> Self {
        self.doc.add_term(weight, term, None);
        self
    }

    /// Build the document.
    pub fn build(self) -> Document {
        self.doc
    }
}

// ============================================================================
// Tests
// ============================================================================
