//! Search engine abstraction and the tantivy engine.
//!
//! [`SearchEngine`] is the write side: documents are stored, replaced by
//! unique key, deleted, and committed. [`IndexReader`] is the read side and
//! answers queries against the last committed state.
//!
//! # Tantivy layout
//!
//! [`TantivyEngine`] maps a [`Document`] onto three tantivy fields:
//!
//! | Field | Options | Content |
//! |-------|---------|---------|
//! | `terms` | raw tokenizer, with frequencies | every term, repeated `wdf` times |
//! | `values` | raw tokenizer | `<slot>:<encoded value>` per populated slot |
//! | `document` | stored | the document as JSON |
//!
//! Terms keep their `X`/`Z`/`Q` prefixes, so replacing a document is a
//! `delete_term` on its `Q<key>` term and deleting a class is a
//! `delete_term` on its class marker. Value slots are zero-padded, so a
//! range over one slot is a tantivy range over `values`. Relevance is
//! tantivy's BM25.
//!
//! The reader is reloaded only on commit: a reader obtained before a commit
//! keeps seeing the old state.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use tantivy::collector::{Count, TopDocs};
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, EmptyQuery, Occur, Query as TantivyQuery,
    RangeQuery, TermQuery,
};
use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions, Value as _,
};
use tantivy::{DocAddress, Index, ReloadPolicy, Searcher, TantivyDocument, Term};

use quill_core::util::terms::is_unprefixed;
use quill_core::{Error, Result, class_term, unique_term};

use crate::document::Document;
use crate::query::Query;

/// Engine-assigned document id.
pub type DocId = u64;

/// One matching document.
#[derive(Debug, Clone)]
pub struct Match {
    /// Engine document id.
    pub docid: DocId,
    /// Raw weight.
    pub weight: f64,
    /// Weight relative to the best match, 0-100.
    pub percent: u8,
    /// The stored document.
    pub document: Document,
}

/// Ranked matches of one query.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    matches: Vec<Match>,
    estimated: usize,
}

impl MatchSet {
    /// Create a match set from ranked matches.
    pub fn new(matches: Vec<Match>) -> Self {
        let estimated = matches.len();
        Self { matches, estimated }
    }

    /// Estimated total number of matches.
    pub fn matches_estimated(&self) -> usize {
        self.estimated
    }

    /// Number of matches held.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Returns `true` if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Iterate over matches in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter()
    }

    /// Take `count` matches starting at `offset`.
    pub fn into_window(self, offset: usize, count: usize) -> Vec<Match> {
        self.matches.into_iter().skip(offset).take(count).collect()
    }
}

/// Ordering of a match set.
#[derive(Debug, Clone, Default)]
pub struct EnquireOptions {
    /// Value slots to sort by, most significant first. Empty sorts by weight.
    pub sort_by: Vec<u32>,
    /// Reverse the value order.
    pub descending: bool,
}

/// Read access to a committed index state.
pub trait IndexReader: Send + Sync {
    /// Number of documents.
    fn size(&self) -> usize;

    /// Run a query.
    fn enquire(&self, query: &Query, options: &EnquireOptions) -> Result<MatchSet>;

    /// Number of documents indexed by `term`.
    fn term_frequency(&self, term: &str) -> usize;

    /// A close vocabulary word if `word` is not itself indexed.
    fn spelling_suggestion(&self, word: &str) -> Option<String>;
}

/// Write access to an index.
pub trait SearchEngine: Send {
    /// Engine name for diagnostics.
    fn name(&self) -> &str;

    /// Add a document, replacing any document with the same unique key.
    fn store(&mut self, document: Document) -> Result<()>;

    /// Delete the document with unique key `key`, if present.
    fn delete_by_unique_term(&mut self, key: &str) -> Result<()>;

    /// Delete every document of `class`.
    fn delete_all_of_class(&mut self, class: &str) -> Result<()>;

    /// Publish pending changes to readers.
    fn commit(&mut self) -> Result<()>;

    /// Reader over the last committed state.
    fn reader(&self) -> Arc<dyn IndexReader>;

    /// Number of committed documents.
    fn size(&self) -> usize;
}

// ============================================================================
// Tantivy engine
// ============================================================================

/// Index writer buffer size (50MB).
const WRITER_BUFFER_SIZE: usize = 50_000_000;

const TERMS_FIELD: &str = "terms";
const VALUES_FIELD: &str = "values";
const DOCUMENT_FIELD: &str = "document";

fn engine_error(context: &str, err: impl fmt::Display) -> Error {
    Error::engine(format!("{context}: {err}"))
}

#[derive(Debug, Clone, Copy)]
struct EngineFields {
    terms: Field,
    values: Field,
    document: Field,
}

impl EngineFields {
    fn build_schema() -> (Schema, Self) {
        let mut builder = Schema::builder();

        let terms_options = TextOptions::default().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer("raw")
                .set_index_option(IndexRecordOption::WithFreqs),
        );
        let terms = builder.add_text_field(TERMS_FIELD, terms_options);
        let values = builder.add_text_field(VALUES_FIELD, STRING);
        let document = builder.add_text_field(DOCUMENT_FIELD, STORED);

        let schema = builder.build();
        (
            schema,
            Self {
                terms,
                values,
                document,
            },
        )
    }

    fn from_schema(schema: &Schema) -> Result<Self> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|e| engine_error("index schema is not a quill schema", e))
        };
        Ok(Self {
            terms: field(TERMS_FIELD)?,
            values: field(VALUES_FIELD)?,
            document: field(DOCUMENT_FIELD)?,
        })
    }

    fn term(&self, text: &str) -> Term {
        Term::from_field_text(self.terms, text)
    }

    fn value_term(&self, slot: u32, value: &str) -> Term {
        Term::from_field_text(self.values, &format!("{slot:010}:{value}"))
    }

    /// First key past every value of `slot`.
    fn value_slot_end(&self, slot: u32) -> Term {
        Term::from_field_text(self.values, &format!("{slot:010};"))
    }

    fn to_tantivy_doc(&self, document: &Document) -> Result<TantivyDocument> {
        let mut doc = TantivyDocument::new();
        for (term, wdf) in document.terms() {
            for _ in 0..wdf.max(1) {
                doc.add_text(self.terms, term);
            }
        }
        for (slot, value) in document.values() {
            if !value.is_empty() {
                doc.add_text(self.values, format!("{slot:010}:{value}"));
            }
        }
        doc.add_text(self.document, serde_json::to_string(document)?);
        Ok(doc)
    }
}

/// Search engine over a tantivy index, in RAM or in a directory.
pub struct TantivyEngine {
    index: Index,
    writer: tantivy::IndexWriter,
    reader: tantivy::IndexReader,
    fields: EngineFields,
}

impl TantivyEngine {
    /// Create an engine over a fresh in-memory index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Engine`] if tantivy cannot create the writer or
    /// reader.
    pub fn in_memory() -> Result<Self> {
        let (schema, fields) = EngineFields::build_schema();
        Self::with_index(Index::create_in_ram(schema), fields)
    }

    /// Create or open an index in `index_path`.
    ///
    /// If the directory holds no index, a new one is created.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if the directory cannot be created
    /// - [`Error::Engine`] if the index cannot be opened or created
    pub fn open_or_create(index_path: &Path) -> Result<Self> {
        if !index_path.exists() {
            std::fs::create_dir_all(index_path)?;
        }

        if index_path.join("meta.json").exists() {
            let index = Index::open_in_dir(index_path)
                .map_err(|e| engine_error("failed to open index", e))?;
            let fields = EngineFields::from_schema(&index.schema())?;
            log::info!("opened index at {}", index_path.display());
            Self::with_index(index, fields)
        } else {
            let (schema, fields) = EngineFields::build_schema();
            let index = Index::create_in_dir(index_path, schema)
                .map_err(|e| engine_error("failed to create index", e))?;
            log::info!("created index at {}", index_path.display());
            Self::with_index(index, fields)
        }
    }

    fn with_index(index: Index, fields: EngineFields) -> Result<Self> {
        let writer = index
            .writer(WRITER_BUFFER_SIZE)
            .map_err(|e| engine_error("failed to create index writer", e))?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| engine_error("failed to create index reader", e))?;
        Ok(Self {
            index,
            writer,
            reader,
            fields,
        })
    }

    /// The underlying tantivy index.
    pub fn index(&self) -> &Index {
        &self.index
    }
}

impl SearchEngine for TantivyEngine {
    fn name(&self) -> &str {
        "tantivy"
    }

    fn store(&mut self, document: Document) -> Result<()> {
        if document.data().is_empty() {
            return Err(Error::engine("document has no unique key"));
        }
        let doc = self.fields.to_tantivy_doc(&document)?;
        self.writer
            .delete_term(self.fields.term(&unique_term(document.data())));
        self.writer
            .add_document(doc)
            .map_err(|e| engine_error("failed to add document", e))?;
        log::debug!("staged document '{}'", document.data());
        Ok(())
    }

    fn delete_by_unique_term(&mut self, key: &str) -> Result<()> {
        self.writer.delete_term(self.fields.term(&unique_term(key)));
        log::debug!("staged deletion of '{key}'");
        Ok(())
    }

    fn delete_all_of_class(&mut self, class: &str) -> Result<()> {
        self.writer.delete_term(self.fields.term(&class_term(class)));
        log::debug!("staged deletion of class '{class}'");
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.writer
            .commit()
            .map_err(|e| engine_error("failed to commit index", e))?;
        self.reader
            .reload()
            .map_err(|e| engine_error("failed to reload index reader", e))?;
        Ok(())
    }

    fn reader(&self) -> Arc<dyn IndexReader> {
        Arc::new(TantivyReader {
            searcher: self.reader.searcher(),
            fields: self.fields,
        })
    }

    fn size(&self) -> usize {
        usize::try_from(self.reader.searcher().num_docs()).unwrap_or(usize::MAX)
    }
}

impl fmt::Debug for TantivyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TantivyEngine")
            .field("index", &"<tantivy::Index>")
            .field("documents", &self.size())
            .finish()
    }
}

/// Reader over one committed [`TantivyEngine`] state.
#[derive(Clone)]
pub struct TantivyReader {
    searcher: Searcher,
    fields: EngineFields,
}

impl TantivyReader {
    fn compile(&self, query: &Query) -> Result<Box<dyn TantivyQuery>> {
        let compiled: Box<dyn TantivyQuery> = match query {
            Query::MatchAll => Box::new(AllQuery),
            Query::MatchNothing => Box::new(EmptyQuery),
            Query::Term { term, wqf } => self.term_query(term, *wqf),
            Query::Wildcard {
                prefix,
                pattern,
                max_expansion,
            } => {
                let terms = self.expand(&format!("{prefix}{pattern}"), *max_expansion)?;
                if terms.is_empty() {
                    Box::new(EmptyQuery)
                } else {
                    Box::new(BooleanQuery::new(
                        terms
                            .iter()
                            .map(|term| (Occur::Should, self.term_query(term, 1)))
                            .collect(),
                    ))
                }
            }
            Query::ValueRange { slot, lower, upper } => {
                let lower = Bound::Included(
                    self.fields
                        .value_term(*slot, lower.as_deref().unwrap_or_default()),
                );
                let upper = match upper {
                    Some(upper) => Bound::Included(self.fields.value_term(*slot, upper)),
                    None => Bound::Excluded(self.fields.value_slot_end(*slot)),
                };
                Box::new(ConstScoreQuery::new(
                    Box::new(RangeQuery::new(lower, upper)),
                    0.0,
                ))
            }
            Query::And(parts) | Query::Or(parts) if parts.is_empty() => Box::new(EmptyQuery),
            Query::And(parts) => self.boolean(Occur::Must, parts)?,
            Query::Or(parts) => self.boolean(Occur::Should, parts)?,
            Query::AndNot(positive, negative) => Box::new(BooleanQuery::new(vec![
                (Occur::Must, self.compile(positive)?),
                (Occur::MustNot, self.compile(negative)?),
            ])),
            Query::Filter(query, filter) => Box::new(BooleanQuery::new(vec![
                (Occur::Must, self.compile(query)?),
                (
                    Occur::Must,
                    Box::new(ConstScoreQuery::new(self.compile(filter)?, 0.0)),
                ),
            ])),
        };
        Ok(compiled)
    }

    fn term_query(&self, term: &str, wqf: u32) -> Box<dyn TantivyQuery> {
        let query = Box::new(TermQuery::new(
            self.fields.term(term),
            IndexRecordOption::WithFreqs,
        ));
        if wqf == 1 {
            query
        } else {
            Box::new(BoostQuery::new(query, wqf as f32))
        }
    }

    fn boolean(&self, occur: Occur, parts: &[Query]) -> Result<Box<dyn TantivyQuery>> {
        let clauses = parts
            .iter()
            .map(|part| Ok((occur, self.compile(part)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    /// Distinct terms starting with `prefix`, across segments. Terms only
    /// held by deleted documents may be included.
    fn vocabulary(&self, prefix: &str) -> Result<BTreeSet<String>> {
        let mut terms = BTreeSet::new();
        for segment in self.searcher.segment_readers() {
            let inverted = segment
                .inverted_index(self.fields.terms)
                .map_err(|e| engine_error("failed to read term dictionary", e))?;
            let mut stream = inverted
                .terms()
                .range()
                .ge(prefix.as_bytes())
                .into_stream()
                .map_err(|e| engine_error("failed to stream term dictionary", e))?;
            while stream.advance() {
                let key = stream.key();
                if !key.starts_with(prefix.as_bytes()) {
                    break;
                }
                if let Ok(term) = std::str::from_utf8(key) {
                    terms.insert(term.to_string());
                }
            }
        }
        Ok(terms)
    }

    /// Live terms starting with `stem`, most frequent first.
    fn expand(&self, stem: &str, limit: Option<usize>) -> Result<Vec<String>> {
        let mut terms: Vec<(String, usize)> = self
            .vocabulary(stem)?
            .into_iter()
            .map(|term| {
                let frequency = self.term_frequency(&term);
                (term, frequency)
            })
            .filter(|(_, frequency)| *frequency > 0)
            .collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(limit) = limit {
            terms.truncate(limit);
        }
        Ok(terms.into_iter().map(|(term, _)| term).collect())
    }

    fn load(&self, address: DocAddress) -> Result<Document> {
        let stored: TantivyDocument = self
            .searcher
            .doc(address)
            .map_err(|e| engine_error("failed to load document", e))?;
        let json = stored
            .get_first(self.fields.document)
            .and_then(|value| value.as_str())
            .ok_or_else(|| Error::engine("stored document is missing"))?;
        Ok(serde_json::from_str(json)?)
    }
}

fn doc_id(address: DocAddress) -> DocId {
    (u64::from(address.segment_ord) << 32) | u64::from(address.doc_id)
}

fn rank(matches: &mut [Match], options: &EnquireOptions) {
    let by_weight = |a: &Match, b: &Match| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(Ordering::Equal)
            .then(a.docid.cmp(&b.docid))
    };
    if options.sort_by.is_empty() {
        matches.sort_by(by_weight);
    } else {
        matches.sort_by(|a, b| {
            let values = options
                .sort_by
                .iter()
                .map(|slot| a.document.get_value(*slot).cmp(b.document.get_value(*slot)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal);
            let values = if options.descending {
                values.reverse()
            } else {
                values
            };
            values.then_with(|| by_weight(a, b))
        });
    }
}

impl IndexReader for TantivyReader {
    fn size(&self) -> usize {
        usize::try_from(self.searcher.num_docs()).unwrap_or(usize::MAX)
    }

    fn enquire(&self, query: &Query, options: &EnquireOptions) -> Result<MatchSet> {
        let size = self.size();
        if size == 0 {
            return Ok(MatchSet::default());
        }
        let compiled = self.compile(query)?;
        let top_docs = self
            .searcher
            .search(&*compiled, &TopDocs::with_limit(size).order_by_score())
            .map_err(|e| engine_error("search failed", e))?;

        let max = top_docs
            .iter()
            .map(|(score, _)| f64::from(*score))
            .fold(0.0_f64, f64::max);
        let mut matches = top_docs
            .into_iter()
            .map(|(score, address)| {
                let weight = f64::from(score);
                let percent = if max > 0.0 {
                    (weight / max * 100.0).round() as u8
                } else {
                    100
                };
                Ok(Match {
                    docid: doc_id(address),
                    weight,
                    percent,
                    document: self.load(address)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        rank(&mut matches, options);
        Ok(MatchSet::new(matches))
    }

    fn term_frequency(&self, term: &str) -> usize {
        let query = TermQuery::new(self.fields.term(term), IndexRecordOption::Basic);
        match self.searcher.search(&query, &Count) {
            Ok(count) => count,
            Err(e) => {
                log::warn!("failed to count documents for '{term}': {e}");
                0
            }
        }
    }

    fn spelling_suggestion(&self, word: &str) -> Option<String> {
        let word = word.to_lowercase();
        let length = word.chars().count();
        if length < 3 || self.term_frequency(&word) > 0 {
            return None;
        }
        let max_distance = if length <= 4 { 1 } else { 2 };
        let vocabulary = match self.vocabulary("") {
            Ok(vocabulary) => vocabulary,
            Err(e) => {
                log::warn!("no spelling suggestion for '{word}': {e}");
                return None;
            }
        };
        vocabulary
            .into_iter()
            .filter(|term| is_unprefixed(term))
            .filter_map(|term| {
                let distance = strsim::levenshtein(&word, &term);
                (distance > 0 && distance <= max_distance).then_some((distance, term))
            })
            .map(|(distance, term)| (distance, self.term_frequency(&term), term))
            .filter(|(_, frequency, _)| *frequency > 0)
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)))
            .map(|(_, _, term)| term)
    }
}

impl fmt::Debug for TantivyReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TantivyReader")
            .field("documents", &self.size())
            .field("segments", &self.searcher.segment_readers().len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
