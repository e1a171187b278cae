//! Blueprint-driven indexing for quill.
//!
//! Applications describe how each class of object maps onto a search index
//! with a [`Blueprint`]. The [`BlueprintRegistry`] assigns value slots and
//! codecs, the [`Indexer`] turns objects into [`Document`]s, the
//! [`QueryParser`] turns query strings into [`Query`] trees, and a
//! [`Resultset`] pages through matches with decoded attribute values.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        quill-index                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Database (engine + registry + config)                      │
//! │  ├── IndexWriter: Direct / Transaction / NoOp / Queued      │
//! │  └── search, search_class, facets                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BlueprintRegistry ── RegistrySnapshot ── AccessorTable     │
//! │  Blueprint (attributes, indexed methods, dependencies)      │
//! │  CodecRegistry (TypeTag → TypeCodec)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Indexer ─► Document        QueryParser ─► Query            │
//! │  SearchEngine / IndexReader (TantivyEngine)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Term conventions
//!
//! | Term | Meaning |
//! |------|---------|
//! | `X<FIELD>word` | word from field `field` |
//! | `word` | word from any field |
//! | `Z<prefix>stem` | stemmed form, with or without field prefix |
//! | `XINDEXED_CLASS<class>` | class marker, lowercased class name |
//! | `Q<key>` | unique key |
//!
//! Slot 0 stores the class name. Attribute slots are numbered from 1 in
//! the sorted order of all attribute names known to the registry.

pub mod accessors;
pub mod adapter;
pub mod blueprint;
pub mod codec;
pub mod database;
pub mod document;
pub mod engine;
pub mod indexer;
pub mod query;
pub mod query_parser;
pub mod registry;
pub mod resultset;
pub mod stemming;
pub mod types;
pub mod writer;

// Re-exports
pub use accessors::{Accessor, AccessorTable};
pub use adapter::{Adapter, GenericAdapter, Indexable, MapRecord, create_adapter};
pub use blueprint::{AttributeOptions, Blueprint, Dependency, IndexOptions};
pub use codec::{CodecRegistry, TypeCodec, TypeTag, sortable_serialise, sortable_unserialise};
pub use database::{Database, Facet, SearchOptions};
pub use document::{Document, DocumentBuilder};
pub use engine::{
    DocId, EnquireOptions, IndexReader, Match, MatchSet, SearchEngine, TantivyEngine,
    TantivyReader,
};
pub use indexer::Indexer;
pub use query::Query;
pub use query_parser::{ParsedQuery, QueryParser};
pub use registry::{BlueprintRegistry, RegistrySnapshot};
pub use resultset::{Resultset, SearchHit};
pub use stemming::Stemming;
pub use types::{DefaultOperator, IndexConfig};
pub use writer::{
    DirectWriter, IndexStats, IndexWriter, LifecycleHooks, NoOpWriter, QueuedWriter,
    TransactionWriter, WriteOp, create_writer,
};

pub use quill_core::{Error, Result, Value};
