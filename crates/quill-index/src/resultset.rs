//! Paginated search results.
//!
//! A [`Resultset`] is one page of a match set. Every [`SearchHit`] carries
//! the accessor table of its class, so stored attributes read back as typed
//! values:
//!
//! ```rust,ignore
//! let results = db.search("name:john", &SearchOptions::default())?;
//! for hit in results.iter() {
//!     println!("{} {}% {}", hit.indexed_class(), hit.score(), hit.get("born_on")?);
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use quill_core::{Error, Result, Value, split_key};

use crate::accessors::AccessorTable;
use crate::document::Document;
use crate::engine::{DocId, MatchSet};
use crate::registry::RegistrySnapshot;

/// Pagination parameters for [`Resultset::new`].
#[derive(Debug, Clone, Default)]
pub struct ResultsetOptions {
    /// Number of documents in the searched database.
    pub db_size: usize,
    /// Maximum number of hits to page through (defaults to all).
    pub limit: Option<usize>,
    /// 1-based page (defaults to 1).
    pub page: Option<usize>,
    /// Hits per page (defaults to the limit).
    pub per_page: Option<usize>,
    /// Corrected query string, if the parser produced one.
    pub spelling_suggestion: Option<String>,
}

/// One matching document with typed access to its attributes.
#[derive(Debug, Clone)]
pub struct SearchHit {
    docid: DocId,
    percent: u8,
    document: Document,
    accessors: Arc<AccessorTable>,
}

impl SearchHit {
    /// Engine document id.
    pub fn docid(&self) -> DocId {
        self.docid
    }

    /// Relevance in percent of the best match.
    pub fn score(&self) -> u8 {
        self.percent
    }

    /// Class name stored in slot 0.
    pub fn indexed_class(&self) -> &str {
        self.document.get_value(0)
    }

    /// The unique key.
    pub fn unique_key(&self) -> &str {
        self.document.data()
    }

    /// The object id: the unique key without its class part.
    pub fn id(&self) -> Option<&str> {
        split_key(self.unique_key()).map(|(_, id)| id)
    }

    /// The raw document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Decoded attribute value. `score` yields the relevance percentage.
    pub fn get(&self, attribute: &str) -> Result<Value> {
        match attribute {
            "score" => Ok(Value::Integer(i64::from(self.percent))),
            _ => self.accessors.get(&self.document, attribute),
        }
    }

    /// All attributes of the hit's class, decoded.
    pub fn attributes(&self) -> Result<BTreeMap<String, Value>> {
        self.accessors.read_all(&self.document)
    }
}

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct Resultset {
    hits: usize,
    total_pages: usize,
    current_page: usize,
    per_page: usize,
    items: Vec<SearchHit>,
    spelling_suggestion: Option<String>,
}

impl Resultset {
    /// A resultset without hits.
    pub fn empty(spelling_suggestion: Option<String>) -> Self {
        Self {
            spelling_suggestion,
            ..Self::default()
        }
    }

    /// Paginate `matches`.
    ///
    /// # Errors
    ///
    /// - [`Error::PageOutOfRange`] if the requested page lies outside the
    ///   limited result window
    /// - [`Error::BlueprintNotFound`] if a hit's class has no blueprint
    pub fn new(
        matches: Option<MatchSet>,
        registry: &RegistrySnapshot,
        options: ResultsetOptions,
    ) -> Result<Self> {
        let Some(matches) = matches else {
            return Ok(Self::empty(options.spelling_suggestion));
        };

        let hits = match options.db_size {
            0 => matches.matches_estimated(),
            size => matches.matches_estimated().min(size),
        };
        if hits == 0 {
            return Ok(Self::empty(options.spelling_suggestion));
        }

        let limit = options.limit.filter(|l| *l > 0).unwrap_or(hits).min(hits);
        let per_page = options.per_page.filter(|p| *p > 0).unwrap_or(limit);
        let total_pages = limit.div_ceil(per_page);
        let page = options.page.unwrap_or(1);

        let offset = page.saturating_sub(1).saturating_mul(per_page);
        if page == 0 || offset >= limit {
            return Err(Error::PageOutOfRange { page, total_pages });
        }
        let count = per_page.min(limit - offset);

        let items = matches
            .into_window(offset, count)
            .into_iter()
            .map(|m| {
                let accessors = registry.accessors_for(m.document.get_value(0))?;
                Ok(SearchHit {
                    docid: m.docid,
                    percent: m.percent,
                    document: m.document,
                    accessors,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            hits,
            total_pages,
            current_page: page,
            per_page,
            items,
            spelling_suggestion: options.spelling_suggestion,
        })
    }

    /// Total number of matches.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Number of pages in the limited window.
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// The current page (1-based, 0 when empty).
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Page size.
    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// The page before this one.
    pub fn previous_page(&self) -> Option<usize> {
        (self.current_page > 1).then(|| self.current_page - 1)
    }

    /// The page after this one.
    pub fn next_page(&self) -> Option<usize> {
        (self.current_page < self.total_pages).then(|| self.current_page + 1)
    }

    /// Corrected query string, if any.
    pub fn spelling_suggestion(&self) -> Option<&str> {
        self.spelling_suggestion.as_deref()
    }

    /// Hits on this page.
    pub fn items(&self) -> &[SearchHit] {
        &self.items
    }

    /// Iterate over the hits on this page.
    pub fn iter(&self) -> std::slice::Iter<'_, SearchHit> {
        self.items.iter()
    }

    /// Number of hits on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if this page has no hits.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl IntoIterator for Resultset {
    type Item = SearchHit;
    type IntoIter = std::vec::IntoIter<SearchHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Resultset {
    type Item = &'a SearchHit;
    type IntoIter = std::slice::Iter<'a, SearchHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
