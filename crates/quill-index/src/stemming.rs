//! Language support: stemming, stopwords, and word splitting.
//!
//! Text is split into words by a tantivy [`TextAnalyzer`]:
//! `SimpleTokenizer` followed by `LowerCaser`, with a Snowball `Stemmer`
//! appended when a language is configured. Every [`Word`] keeps the byte
//! offsets the tokenizer reported, so callers can map terms back onto the
//! text they came from.
//!
//! A [`Stemming`] bundle exists only when a language is configured. It is
//! shared by the indexer (stemmed terms) and the query parser (stemmed query
//! words, stopword removal, spelling). Stopword lists come from the
//! `stop-words` crate.
//!
//! # Example
//!
//! ```rust
//! use quill_index::stemming::{resolve, words};
//! use quill_index::IndexConfig;
//!
//! let stemming = resolve(&IndexConfig::default().with_language("en"))
//!     .unwrap()
//!     .unwrap();
//! let stems: Vec<String> = stemming.stemmed_words("Running dogs").into_iter().map(|w| w.term).collect();
//! assert_eq!(stems, vec!["run", "dog"]);
//! assert!(stemming.is_stopword("the"));
//!
//! let found: Vec<&str> = words("Hello, world-wide web!").iter().map(|w| w.text).collect();
//! assert_eq!(found, vec!["Hello", "world", "wide", "web"]);
//! ```

use std::collections::HashSet;
use std::fmt;

use stop_words::{LANGUAGE, get};
use tantivy::tokenizer::{
    Language, LowerCaser, SimpleTokenizer, Stemmer, TextAnalyzer, TokenStream,
};

use quill_core::{Error, Result};

use crate::types::IndexConfig;

/// Language codes with stemmer and stopword support.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "da", "de", "en", "es", "fi", "fr", "hu", "it", "nl", "no", "pt", "ro", "ru", "sv", "tr",
];

fn language_for(code: &str) -> Option<(Language, LANGUAGE)> {
    let pair = match code {
        "da" => (Language::Danish, LANGUAGE::Danish),
        "de" => (Language::German, LANGUAGE::German),
        "en" => (Language::English, LANGUAGE::English),
        "es" => (Language::Spanish, LANGUAGE::Spanish),
        "fi" => (Language::Finnish, LANGUAGE::Finnish),
        "fr" => (Language::French, LANGUAGE::French),
        "hu" => (Language::Hungarian, LANGUAGE::Hungarian),
        "it" => (Language::Italian, LANGUAGE::Italian),
        "nl" => (Language::Dutch, LANGUAGE::Dutch),
        "no" => (Language::Norwegian, LANGUAGE::Norwegian),
        "pt" => (Language::Portuguese, LANGUAGE::Portuguese),
        "ro" => (Language::Romanian, LANGUAGE::Romanian),
        "ru" => (Language::Russian, LANGUAGE::Russian),
        "sv" => (Language::Swedish, LANGUAGE::Swedish),
        "tr" => (Language::Turkish, LANGUAGE::Turkish),
        _ => return None,
    };
    Some(pair)
}

/// Resolve the configured language.
///
/// Returns `Ok(None)` when no language (or `"none"`) is configured.
///
/// # Errors
///
/// Returns [`Error::UnsupportedLanguage`] for codes outside
/// [`SUPPORTED_LANGUAGES`].
pub fn resolve(config: &IndexConfig) -> Result<Option<Stemming>> {
    let code = match config.language.as_deref().map(str::trim) {
        None | Some("") => return Ok(None),
        Some(code) => code.to_lowercase(),
    };
    if code == "none" {
        return Ok(None);
    }

    let (language, stop_language) =
        language_for(&code).ok_or_else(|| Error::UnsupportedLanguage { code: code.clone() })?;

    let mut stopwords: HashSet<String> = get(stop_language)
        .iter()
        .map(|s| s.to_lowercase())
        .collect();
    for word in &config.custom_stopwords {
        stopwords.insert(word.to_lowercase());
    }
    let allowlist: HashSet<String> = config.allowlist.iter().cloned().collect();

    log::debug!(
        "stemming enabled for '{code}' ({} stopwords)",
        stopwords.len()
    );

    Ok(Some(Stemming {
        code,
        language,
        stopwords,
        allowlist,
    }))
}

/// Stemmer and stopword list of one language.
#[derive(Clone)]
pub struct Stemming {
    code: String,
    language: Language,
    stopwords: HashSet<String>,
    allowlist: HashSet<String>,
}

impl Stemming {
    /// The language code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Split `text` into words whose terms are lowercased stems.
    ///
    /// Yields the same words, at the same offsets, as [`words`].
    pub fn stemmed_words<'t>(&self, text: &'t str) -> Vec<Word<'t>> {
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(Stemmer::new(self.language))
            .build();
        analyze(analyzer, text)
    }

    /// Returns `true` for stopwords.
    ///
    /// The allowlist is checked case-sensitively, the stopword list
    /// case-insensitively.
    pub fn is_stopword(&self, word: &str) -> bool {
        if self.allowlist.contains(word) {
            return false;
        }
        self.stopwords.contains(&word.to_lowercase())
    }

    /// Number of stopwords, custom ones included.
    pub fn stopword_count(&self) -> usize {
        self.stopwords.len()
    }
}

impl fmt::Debug for Stemming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stemming")
            .field("code", &self.code)
            .field("stopword_count", &self.stopwords.len())
            .field("allowlist_count", &self.allowlist.len())
            .finish()
    }
}

// ============================================================================
// Word splitting
// ============================================================================

/// One word of analyzed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word<'t> {
    /// The word as written.
    pub text: &'t str,
    /// Byte offset of the word's first character.
    pub offset: usize,
    /// The analyzer's output: the lowercased word, or its stem.
    pub term: String,
}

/// Split text into lowercased words: maximal runs of alphanumeric
/// characters.
pub fn words(text: &str) -> Vec<Word<'_>> {
    let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .build();
    analyze(analyzer, text)
}

fn analyze(mut analyzer: TextAnalyzer, text: &str) -> Vec<Word<'_>> {
    let mut found = Vec::new();
    {
        let mut stream = analyzer.token_stream(text);
        while stream.advance() {
            let token = stream.token();
            found.push(Word {
                text: &text[token.offset_from..token.offset_to],
                offset: token.offset_from,
                term: token.text.clone(),
            });
        }
    }
    found
}

// ============================================================================
// Tests
// ============================================================================
