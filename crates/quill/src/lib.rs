//! quill umbrella crate.
//!
//! Re-exports the quill components and a prelude with the types most
//! applications need.

#![doc = include_str!("../README.md")]

pub use quill_core as core;
pub use quill_index as index;

/// Commonly used types.
pub mod prelude {
    pub use quill_core::{BigDecimal, Error, Result, Value};
    pub use quill_index::{
        AttributeOptions, BlueprintRegistry, Database, IndexConfig, IndexOptions, IndexWriter,
        Indexable, LifecycleHooks, MapRecord, SearchOptions, TypeTag,
    };
}
