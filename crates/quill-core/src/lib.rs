//! quill core: shared errors, values, and naming utilities.
//!
//! This crate has no internal quill dependencies. Everything that touches
//! blueprints, codecs or the engine lives in `quill-index`.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`value`]: The dynamic [`Value`] passed between objects, codecs and accessors
//! - [`util`]: Unique keys and term prefixes

pub mod error;
pub mod util;
pub mod value;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use value::Value;

pub use bigdecimal::BigDecimal;

// Convenience re-exports from util
pub use util::ids::{split_key, unique_key};
pub use util::terms::{INDEXED_CLASS, class_term, field_prefix, unique_term};
