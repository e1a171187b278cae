//! Configuration types.
//!
//! [`IndexConfig`] is loaded from TOML (or built in code) and selects the
//! language, adapter, and writer strategy a [`Database`](crate::Database)
//! works with.
//!
//! ```toml
//! language = "en"
//! writer = "transactional"
//! term_min_length = 2
//! custom_stopwords = ["foo"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use quill_core::Result;

/// Operator joining query words that have no explicit operator between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultOperator {
    /// Every word must match.
    #[default]
    And,
    /// Any word may match.
    Or,
}

/// Index configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Two-letter stemming language code ("en", "de", ...).
    ///
    /// `None` or `"none"` disables stemming, stopwords, and spelling.
    #[serde(default)]
    pub language: Option<String>,

    /// Adapter name. Only "generic" is built in.
    #[serde(default = "default_adapter")]
    pub adapter: String,

    /// Writer strategy: "direct", "transactional", "queued", or "noop".
    #[serde(default = "default_writer")]
    pub writer: String,

    /// Words shorter than this (in characters) produce no terms.
    #[serde(default = "default_term_min_length")]
    pub term_min_length: usize,

    /// Upper bound on the terms a wildcard expands to.
    #[serde(default)]
    pub max_expansion: Option<usize>,

    /// Operator between query words.
    #[serde(default)]
    pub default_operator: DefaultOperator,

    /// Extra stopwords on top of the language list.
    #[serde(default)]
    pub custom_stopwords: Vec<String>,

    /// Words never treated as stopwords.
    #[serde(default)]
    pub allowlist: Vec<String>,
}

fn default_adapter() -> String {
    "generic".to_string()
}

fn default_writer() -> String {
    "direct".to_string()
}

fn default_term_min_length() -> usize {
    1
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            language: None,
            adapter: default_adapter(),
            writer: default_writer(),
            term_min_length: default_term_min_length(),
            max_expansion: None,
            default_operator: DefaultOperator::default(),
            custom_stopwords: Vec::new(),
            allowlist: Vec::new(),
        }
    }
}

impl IndexConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded index configuration from {}", path.display());
        Ok(config)
    }

    /// Set the stemming language.
    pub fn with_language(mut self, code: impl Into<String>) -> Self {
        self.language = Some(code.into());
        self
    }

    /// Set the writer strategy.
    pub fn with_writer(mut self, writer: impl Into<String>) -> Self {
        self.writer = writer.into();
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
