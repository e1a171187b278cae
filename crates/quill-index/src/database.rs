//! Database facade.
//!
//! [`Database`] ties an engine, a blueprint registry and an [`IndexConfig`]
//! together. It is cheap to clone; clones share the engine.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use quill_index::{
//!     AttributeOptions, BlueprintRegistry, Database, IndexConfig, IndexWriter, MapRecord,
//!     SearchOptions, TypeTag,
//! };
//!
//! let registry = Arc::new(BlueprintRegistry::new());
//! registry
//!     .setup("Person", |bp| {
//!         bp.attribute("name", AttributeOptions::default())?
//!             .attribute("born_on", AttributeOptions::typed(TypeTag::Date))?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let db = Database::in_memory(registry, IndexConfig::default()).unwrap();
//! let person = MapRecord::new("Person", "1")
//!     .with("name", "John Doe")
//!     .with("born_on", "2011-01-01".parse::<chrono::NaiveDate>().unwrap());
//! db.writer().unwrap().index(&person).unwrap();
//!
//! let results = db.search("name:john", &SearchOptions::default()).unwrap();
//! assert_eq!(results.hits(), 1);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use quill_core::{Error, Result, Value, class_term};

use crate::adapter::{Indexable, create_adapter};
use crate::engine::{EnquireOptions, IndexReader, SearchEngine, TantivyEngine};
use crate::indexer::Indexer;
use crate::query::Query;
use crate::query_parser::QueryParser;
use crate::registry::{BlueprintRegistry, RegistrySnapshot};
use crate::resultset::{Resultset, ResultsetOptions};
use crate::stemming::{self, Stemming};
use crate::types::IndexConfig;
use crate::writer::{IndexWriter, TransactionWriter, WriteOp, create_writer};

/// Search parameters.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// 1-based page.
    pub page: Option<usize>,
    /// Hits per page.
    pub per_page: Option<usize>,
    /// Maximum number of hits to page through.
    pub limit: Option<usize>,
    /// Attributes to sort by instead of relevance.
    pub order: Vec<String>,
    /// Sort attributes in descending order.
    pub descending: bool,
}

/// One distinct attribute value and how many matches carry it.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    /// Decoded value.
    pub value: Value,
    /// Number of matching documents.
    pub count: usize,
}

struct Inner {
    engine: Mutex<Box<dyn SearchEngine>>,
    registry: Arc<BlueprintRegistry>,
    config: IndexConfig,
    stemming: Option<Arc<Stemming>>,
}

/// An index plus the schema used to fill and query it.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl Database {
    /// Open a database over `engine`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedLanguage`] if the configured language has no
    ///   stemmer
    /// - [`Error::Config`] if the configured adapter is unknown or differs
    ///   from the registry's
    pub fn new<E>(engine: E, registry: Arc<BlueprintRegistry>, config: IndexConfig) -> Result<Self>
    where
        E: SearchEngine + 'static,
    {
        let stemming = stemming::resolve(&config)?.map(Arc::new);
        let adapter = create_adapter(&config)?;
        if adapter.name() != registry.adapter().name() {
            return Err(Error::config(format!(
                "configured adapter '{}' does not match the registry's '{}'",
                adapter.name(),
                registry.adapter().name()
            )));
        }
        log::info!(
            "opened {} database (language: {}, writer: {})",
            engine.name(),
            config.language.as_deref().unwrap_or("none"),
            config.writer
        );
        Ok(Self {
            inner: Arc::new(Inner {
                engine: Mutex::new(Box::new(engine)),
                registry,
                config,
                stemming,
            }),
        })
    }

    /// Open a database over a fresh in-memory [`TantivyEngine`].
    pub fn in_memory(registry: Arc<BlueprintRegistry>, config: IndexConfig) -> Result<Self> {
        Self::new(TantivyEngine::in_memory()?, registry, config)
    }

    /// Open a database over the tantivy index in `path`, creating it if
    /// needed.
    pub fn open(
        path: &Path,
        registry: Arc<BlueprintRegistry>,
        config: IndexConfig,
    ) -> Result<Self> {
        Self::new(TantivyEngine::open_or_create(path)?, registry, config)
    }

    /// The blueprint registry.
    pub fn registry(&self) -> &Arc<BlueprintRegistry> {
        &self.inner.registry
    }

    /// The configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.inner.config
    }

    /// The resolved language, if any.
    pub fn stemming(&self) -> Option<&Arc<Stemming>> {
        self.inner.stemming.as_ref()
    }

    /// Unique key of `object` as assigned by the registry's adapter.
    pub fn unique_key(&self, object: &dyn Indexable) -> String {
        self.inner.registry.adapter().unique_key(object)
    }

    fn engine(&self) -> Result<MutexGuard<'_, Box<dyn SearchEngine>>> {
        self.inner
            .engine
            .lock()
            .map_err(|_| Error::engine("engine lock poisoned"))
    }

    // ------------------------------------------------------------------------
    // Writing
    // ------------------------------------------------------------------------

    /// Store a document, replacing one with the same unique key.
    pub fn store_doc(&self, document: crate::Document) -> Result<()> {
        self.engine()?.store(document)
    }

    /// Delete the document with `key`.
    pub fn delete_doc_with_unique_term(&self, key: &str) -> Result<()> {
        self.engine()?.delete_by_unique_term(key)
    }

    /// Delete every document of `class`.
    pub fn delete_docs_of_class(&self, class: &str) -> Result<()> {
        self.engine()?.delete_all_of_class(class)
    }

    /// Publish pending changes to readers.
    pub fn commit(&self) -> Result<()> {
        self.engine()?.commit()
    }

    /// Apply `ops` under a single engine lock, optionally committing.
    pub(crate) fn apply(&self, ops: Vec<WriteOp>, commit: bool) -> Result<()> {
        let mut engine = self.engine()?;
        for op in ops {
            match op {
                WriteOp::Store(document) => engine.store(document)?,
                WriteOp::Delete(key) => engine.delete_by_unique_term(&key)?,
                WriteOp::DeleteClass(class) => engine.delete_all_of_class(&class)?,
            }
        }
        if commit {
            engine.commit()?;
        }
        Ok(())
    }

    /// Number of committed documents.
    pub fn size(&self) -> Result<usize> {
        Ok(self.engine()?.size())
    }

    /// Reader over the last commit.
    pub fn reader(&self) -> Result<Arc<dyn IndexReader>> {
        Ok(self.engine()?.reader())
    }

    /// The writer selected by the configuration.
    pub fn writer(&self) -> Result<Box<dyn IndexWriter>> {
        create_writer(self)
    }

    /// Run `f` against a transaction writer and commit its changes once.
    ///
    /// If `f` fails nothing is written.
    pub fn transaction<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&TransactionWriter) -> Result<()>,
    {
        let writer = TransactionWriter::new(self.clone());
        if let Err(err) = f(&writer) {
            log::warn!(
                "transaction failed, discarding {} pending change(s): {err}",
                writer.pending()
            );
            return Err(err);
        }
        writer.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reading
    // ------------------------------------------------------------------------

    /// An indexer over the current registry state.
    pub fn indexer(&self) -> Indexer {
        self.indexer_for(self.inner.registry.snapshot())
    }

    pub(crate) fn indexer_for(&self, snapshot: Arc<RegistrySnapshot>) -> Indexer {
        Indexer::new(snapshot)
            .with_stemming(self.inner.stemming.clone())
            .with_term_min_length(self.inner.config.term_min_length)
    }

    /// A query parser over the current registry state and index.
    pub fn parser(&self) -> Result<QueryParser> {
        let snapshot = self.inner.registry.snapshot();
        self.parser_for(&snapshot, self.reader()?)
    }

    fn parser_for(&self, snapshot: &RegistrySnapshot, reader: Arc<dyn IndexReader>) -> Result<QueryParser> {
        Ok(QueryParser::new(snapshot)?
            .with_stemming(self.inner.stemming.clone())
            .with_reader(reader)
            .with_default_operator(self.inner.config.default_operator)
            .with_max_expansion(self.inner.config.max_expansion))
    }

    /// Search all classes.
    ///
    /// A blank expression yields an empty resultset.
    pub fn search(&self, expression: &str, options: &SearchOptions) -> Result<Resultset> {
        self.search_scoped(None, expression, options)
    }

    /// Search documents of one class.
    ///
    /// A blank expression yields every document of the class.
    pub fn search_class(
        &self,
        class: &str,
        expression: &str,
        options: &SearchOptions,
    ) -> Result<Resultset> {
        self.inner.registry.snapshot().blueprint_for(class)?;
        self.search_scoped(Some(class), expression, options)
    }

    fn search_scoped(
        &self,
        class: Option<&str>,
        expression: &str,
        options: &SearchOptions,
    ) -> Result<Resultset> {
        let snapshot = self.inner.registry.snapshot();
        let reader = self.reader()?;
        let parsed = self
            .parser_for(&snapshot, Arc::clone(&reader))?
            .parse(expression)?;

        let (query, spelling_suggestion) = match (parsed, class) {
            (Some(parsed), None) => (parsed.query, parsed.spelling_suggestion),
            (Some(parsed), Some(class)) => (
                Query::filter(parsed.query, Query::term(class_term(class))),
                parsed.spelling_suggestion,
            ),
            (None, Some(class)) => (Query::term(class_term(class)), None),
            (None, None) => return Ok(Resultset::empty(None)),
        };

        let sort_by = options
            .order
            .iter()
            .map(|attribute| snapshot.value_slot_for(attribute))
            .collect::<Result<Vec<_>>>()?;
        let enquire = EnquireOptions {
            sort_by,
            descending: options.descending,
        };
        let matches = reader.enquire(&query, &enquire)?;
        log::debug!(
            "query {query} matched {} document(s)",
            matches.matches_estimated()
        );

        Resultset::new(
            Some(matches),
            &snapshot,
            ResultsetOptions {
                db_size: reader.size(),
                limit: options.limit,
                page: options.page,
                per_page: options.per_page,
                spelling_suggestion,
            },
        )
    }

    /// Count the distinct values of `attribute` among the matches of
    /// `expression` (all documents when blank), in value order.
    pub fn facets(&self, attribute: &str, expression: &str) -> Result<Vec<Facet>> {
        let snapshot = self.inner.registry.snapshot();
        let slot = snapshot.value_slot_for(attribute)?;
        let codec = snapshot.codec_for(&snapshot.type_info_for(attribute).unwrap_or_default())?;

        let reader = self.reader()?;
        let query = match self
            .parser_for(&snapshot, Arc::clone(&reader))?
            .parse(expression)?
        {
            Some(parsed) => parsed.query,
            None => Query::MatchAll,
        };

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for m in reader.enquire(&query, &EnquireOptions::default())?.iter() {
            let value = m.document.get_value(slot);
            if !value.is_empty() {
                *counts.entry(value.to_string()).or_insert(0) += 1;
            }
        }

        counts
            .into_iter()
            .map(|(encoded, count)| {
                Ok(Facet {
                    value: codec.decode(&encoded)?,
                    count,
                })
            })
            .collect()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("registry", &self.inner.registry)
            .field("config", &self.inner.config)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MapRecord;
    use crate::blueprint::AttributeOptions;
    use crate::codec::TypeTag;
    use chrono::NaiveDate;

    fn database(config: IndexConfig) -> Database {
        let registry = Arc::new(BlueprintRegistry::new());
        registry
            .setup("Person", |bp| {
                bp.attribute("name", AttributeOptions::default())?
                    .attribute("city", AttributeOptions::typed(TypeTag::String))?
                    .attribute("born_on", AttributeOptions::typed(TypeTag::Date))?;
                Ok(())
            })
            .unwrap();
        registry
            .setup("Car", |bp| {
                bp.attribute("name", AttributeOptions::default())?;
                Ok(())
            })
            .unwrap();
        Database::in_memory(registry, config).unwrap()
    }

    fn person(id: &str, name: &str, city: &str, year: i32) -> MapRecord {
        MapRecord::new("Person", id)
            .with("name", name)
            .with("city", city)
            .with("born_on", NaiveDate::from_ymd_opt(year, 6, 1).unwrap())
    }

    fn seed(db: &Database) {
        let writer = db.writer().unwrap();
        writer.index(&person("1", "John Doe", "Berlin", 1980)).unwrap();
        writer.index(&person("2", "Jane Doe", "Hamburg", 1990)).unwrap();
        writer.index(&person("3", "John Smith", "Berlin", 2000)).unwrap();
        writer
            .index(&MapRecord::new("Car", "1").with("name", "John Deere"))
            .unwrap();
    }

    fn keys(results: &Resultset) -> Vec<&str> {
        results.iter().map(|hit| hit.unique_key()).collect()
    }

    #[test]
    fn test_unsupported_language() {
        let registry = Arc::new(BlueprintRegistry::new());
        let err = Database::in_memory(registry, IndexConfig::default().with_language("xx"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage { .. }));
    }

    #[test]
    fn test_unknown_adapter() {
        let registry = Arc::new(BlueprintRegistry::new());
        let config = IndexConfig {
            adapter: "active_record".to_string(),
            ..Default::default()
        };
        let err = Database::in_memory(registry, config).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_store_delete_commit() {
        let db = database(IndexConfig::default());
        let doc = db
            .indexer()
            .build_document_for(&person("1", "John", "Berlin", 1980), "Person-1")
            .unwrap();
        db.store_doc(doc).unwrap();
        assert_eq!(db.size().unwrap(), 0);
        assert_eq!(db.reader().unwrap().size(), 0);

        db.commit().unwrap();
        assert_eq!(db.size().unwrap(), 1);
        assert_eq!(db.reader().unwrap().size(), 1);

        db.delete_doc_with_unique_term("Person-1").unwrap();
        db.commit().unwrap();
        assert_eq!(db.size().unwrap(), 0);
    }

    #[test]
    fn test_delete_docs_of_class() {
        let db = database(IndexConfig::default());
        seed(&db);
        db.delete_docs_of_class("Person").unwrap();
        db.commit().unwrap();
        assert_eq!(db.size().unwrap(), 1);
    }

    #[test]
    fn test_open_persists_across_databases() {
        let dir = tempfile::tempdir().unwrap();
        let registry = database(IndexConfig::default()).registry().clone();
        {
            let db = Database::open(dir.path(), registry.clone(), IndexConfig::default()).unwrap();
            seed(&db);
        }

        let db = Database::open(dir.path(), registry, IndexConfig::default()).unwrap();
        assert_eq!(db.size().unwrap(), 4);
        let results = db.search("name:john", &SearchOptions::default()).unwrap();
        assert_eq!(results.hits(), 3);
    }

    #[test]
    fn test_search() {
        let db = database(IndexConfig::default());
        seed(&db);

        let results = db.search("john", &SearchOptions::default()).unwrap();
        assert_eq!(results.hits(), 3);

        let results = db.search("name:doe -jane", &SearchOptions::default()).unwrap();
        assert_eq!(keys(&results), vec!["Person-1"]);
    }

    #[test]
    fn test_blank_search_is_empty() {
        let db = database(IndexConfig::default());
        seed(&db);
        let results = db.search("  ", &SearchOptions::default()).unwrap();
        assert_eq!(results.hits(), 0);
        assert_eq!(results.total_pages(), 0);
    }

    #[test]
    fn test_search_class() {
        let db = database(IndexConfig::default());
        seed(&db);

        let results = db.search_class("Car", "john", &SearchOptions::default()).unwrap();
        assert_eq!(keys(&results), vec!["Car-1"]);

        let results = db.search_class("Person", "", &SearchOptions::default()).unwrap();
        assert_eq!(results.hits(), 3);

        let err = db
            .search_class("Boat", "john", &SearchOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::BlueprintNotFound { .. }));
    }

    #[test]
    fn test_search_by_indexed_class_prefix() {
        let db = database(IndexConfig::default());
        seed(&db);
        let results = db
            .search("john indexed_class:person", &SearchOptions::default())
            .unwrap();
        assert_eq!(results.hits(), 2);
    }

    #[test]
    fn test_date_range_search() {
        let db = database(IndexConfig::default());
        seed(&db);
        let results = db
            .search("born_on:1985-01-01..1995-12-31", &SearchOptions::default())
            .unwrap();
        assert_eq!(keys(&results), vec!["Person-2"]);
    }

    #[test]
    fn test_sorted_search() {
        let db = database(IndexConfig::default());
        seed(&db);

        let options = SearchOptions {
            order: vec!["born_on".to_string()],
            descending: true,
            ..Default::default()
        };
        let results = db.search_class("Person", "", &options).unwrap();
        assert_eq!(keys(&results), vec!["Person-3", "Person-2", "Person-1"]);

        let options = SearchOptions {
            order: vec!["shoe_size".to_string()],
            ..Default::default()
        };
        assert!(db.search("john", &options).is_err());
    }

    #[test]
    fn test_paginated_search() {
        let db = database(IndexConfig::default());
        seed(&db);
        let options = SearchOptions {
            page: Some(2),
            per_page: Some(2),
            ..Default::default()
        };
        let results = db.search("john", &options).unwrap();
        assert_eq!(results.total_pages(), 2);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_facets() {
        let db = database(IndexConfig::default());
        seed(&db);

        let facets = db.facets("city", "").unwrap();
        assert_eq!(
            facets,
            vec![
                Facet {
                    value: Value::from("Berlin"),
                    count: 2
                },
                Facet {
                    value: Value::from("Hamburg"),
                    count: 1
                },
            ]
        );

        let facets = db.facets("city", "smith").unwrap();
        assert_eq!(facets.len(), 1);
        assert_eq!(facets[0].count, 1);
    }

    #[test]
    fn test_stemmed_search_with_suggestion() {
        let db = database(IndexConfig::default().with_language("en"));
        seed(&db);

        let results = db.search("smiths", &SearchOptions::default()).unwrap();
        assert_eq!(keys(&results), vec!["Person-3"]);

        let results = db.search("johm", &SearchOptions::default()).unwrap();
        assert_eq!(results.hits(), 0);
        assert_eq!(results.spelling_suggestion(), Some("john"));
    }

    #[test]
    fn test_transaction_commits_once() {
        let db = database(IndexConfig::default());
        db.transaction(|tx| {
            tx.index(&person("1", "John", "Berlin", 1980))?;
            tx.index(&person("2", "Jane", "Hamburg", 1990))?;
            assert_eq!(tx.pending(), 2);
            Ok(())
        })
        .unwrap();
        assert_eq!(db.reader().unwrap().size(), 2);
    }

    #[test]
    fn test_failed_transaction_writes_nothing() {
        let db = database(IndexConfig::default());
        let err = db
            .transaction(|tx| {
                tx.index(&person("1", "John", "Berlin", 1980))?;
                tx.index(&MapRecord::new("Boat", "1"))?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, Error::BlueprintNotFound { .. }));
        assert_eq!(db.size().unwrap(), 0);
    }
}
