//! Query string parsing.
//!
//! [`QueryParser`] turns user query strings into [`Query`] trees.
//!
//! # Syntax
//!
//! | Syntax | Meaning |
//! |--------|---------|
//! | `john doe` | both words (default operator AND, configurable) |
//! | `john OR jane` | either word |
//! | `john AND NOT doe`, `john -doe` | exclusion |
//! | `(a OR b) c` | grouping |
//! | `"john doe"` | all words of the phrase, unstemmed |
//! | `joh*` | wildcard, expanded against the vocabulary |
//! | `name:john` | field-qualified search on any searchable prefix |
//! | `indexed_class:Person` | exact class filter |
//! | `born_on:2020-01-01..2020-12-31` | range on a `date`, `number`, or `string` attribute |
//! | `age:30..`, `age:..65` | open ranges |
//!
//! Date range endpoints accept `YYYY-MM-DD` and `YYYYMMDD`; number endpoints
//! any decimal literal.
//!
//! With a language configured, words are stemmed unless capitalised,
//! stopwords are dropped (unless the query has nothing else), and a
//! spelling suggestion is computed against the index vocabulary.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use quill_core::util::terms::STEM_PREFIX;
use quill_core::{Error, INDEXED_CLASS, Result, Value, class_term, field_prefix};

use crate::codec::{
    DateCodec, TypeCodec, TypeTag, parse_compact_date, parse_number, sortable_serialise,
};
use crate::engine::IndexReader;
use crate::query::Query;
use crate::registry::RegistrySnapshot;
use crate::stemming::{Stemming, words};
use crate::types::DefaultOperator;

/// Result of parsing a query string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    /// The query tree.
    pub query: Query,
    /// The query string with misspelled words corrected, if any were.
    pub spelling_suggestion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeKind {
    Date,
    Number,
    String,
}

#[derive(Debug, Clone)]
struct RangeProcessor {
    slot: u32,
    kind: RangeKind,
}

impl RangeProcessor {
    fn process(&self, field: &str, text: &str) -> Result<Query> {
        let (lower, upper) = text
            .split_once("..")
            .ok_or_else(|| Error::query_parse(format!("'{text}' is not a range")))?;
        let lower = self.endpoint(field, lower)?;
        let upper = self.endpoint(field, upper)?;
        if lower.is_none() && upper.is_none() {
            return Err(Error::query_parse(format!(
                "range on '{field}' needs at least one endpoint"
            )));
        }
        Ok(Query::range(self.slot, lower, upper))
    }

    fn endpoint(&self, field: &str, raw: &str) -> Result<Option<String>> {
        let raw = raw.trim().trim_matches('"');
        if raw.is_empty() {
            return Ok(None);
        }
        let encoded = match self.kind {
            RangeKind::Date => {
                let date = parse_query_date(raw).ok_or_else(|| {
                    Error::query_parse(format!("'{raw}' is not a valid date for '{field}'"))
                })?;
                DateCodec.encode(&Value::Date(date))?
            }
            RangeKind::Number => {
                let number = parse_number(raw).ok_or_else(|| {
                    Error::query_parse(format!("'{raw}' is not a valid number for '{field}'"))
                })?;
                sortable_serialise(&number)
            }
            RangeKind::String => raw.to_string(),
        };
        Ok(Some(encoded))
    }
}

fn parse_query_date(raw: &str) -> Option<NaiveDate> {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        parse_compact_date(raw).ok()
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word { text: &'a str, start: usize },
    And,
    Or,
    Not,
    Exclude,
    LParen,
    RParen,
}

fn tokenize(expression: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '(' || c == ')' {
            tokens.push(if c == '(' {
                Token::LParen
            } else {
                Token::RParen
            });
            chars.next();
            continue;
        }

        let mut end = start;
        let mut quoted = false;
        while let Some(&(i, c)) = chars.peek() {
            if !quoted && (c.is_whitespace() || c == '(' || c == ')') {
                break;
            }
            if c == '"' {
                quoted = !quoted;
            }
            end = i + c.len_utf8();
            chars.next();
        }

        let text = &expression[start..end];
        match text {
            "AND" => tokens.push(Token::And),
            "OR" => tokens.push(Token::Or),
            "NOT" => tokens.push(Token::Not),
            _ => {
                if let Some(rest) = text.strip_prefix('-').filter(|r| !r.is_empty()) {
                    tokens.push(Token::Exclude);
                    tokens.push(Token::Word {
                        text: rest,
                        start: start + 1,
                    });
                } else if let Some(rest) = text.strip_prefix('+').filter(|r| !r.is_empty()) {
                    tokens.push(Token::Word {
                        text: rest,
                        start: start + 1,
                    });
                } else {
                    tokens.push(Token::Word { text, start });
                }
            }
        }
    }
    tokens
}

// ============================================================================
// Parser
// ============================================================================

/// Parses query strings against a registry snapshot.
pub struct QueryParser {
    prefixes: BTreeMap<String, String>,
    ranges: BTreeMap<String, RangeProcessor>,
    stemming: Option<Arc<Stemming>>,
    reader: Option<Arc<dyn IndexReader>>,
    default_operator: DefaultOperator,
    max_expansion: Option<usize>,
}

impl QueryParser {
    /// Create a parser knowing the registry's prefixes and range fields.
    pub fn new(registry: &RegistrySnapshot) -> Result<Self> {
        let mut prefixes = BTreeMap::new();
        let mut ranges = BTreeMap::new();

        for field in registry.searchable_prefixes() {
            prefixes.insert(field.clone(), field_prefix(field));

            let kind = match registry.type_info_for(field) {
                Some(TypeTag::Date) => RangeKind::Date,
                Some(TypeTag::Number) => RangeKind::Number,
                Some(TypeTag::String) => RangeKind::String,
                _ => continue,
            };
            let slot = registry.value_slot_for(field)?;
            ranges.insert(field.clone(), RangeProcessor { slot, kind });
        }

        Ok(Self {
            prefixes,
            ranges,
            stemming: None,
            reader: None,
            default_operator: DefaultOperator::And,
            max_expansion: None,
        })
    }

    /// Enable stemming, stopwords and spelling for a language.
    pub fn with_stemming(mut self, stemming: Option<Arc<Stemming>>) -> Self {
        self.stemming = stemming;
        self
    }

    /// Index to expand wildcards against and take spelling suggestions from.
    pub fn with_reader(mut self, reader: Arc<dyn IndexReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Operator between words without an explicit operator.
    pub fn with_default_operator(mut self, operator: DefaultOperator) -> Self {
        self.default_operator = operator;
        self
    }

    /// Bound wildcard expansion to the `limit` most frequent terms.
    pub fn with_max_expansion(mut self, limit: Option<usize>) -> Self {
        self.max_expansion = limit;
        self
    }

    /// Parse `expression`.
    ///
    /// Returns `Ok(None)` for blank expressions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueryParse`] for malformed range endpoints.
    pub fn parse(&self, expression: &str) -> Result<Option<ParsedQuery>> {
        if expression.trim().is_empty() {
            return Ok(None);
        }

        let tokens = tokenize(expression);
        let drop_stopwords = self.stemming.as_ref().is_some_and(|stemming| {
            tokens.iter().any(|token| match token {
                Token::Word { text, .. } => words(text)
                    .iter()
                    .any(|word| !stemming.is_stopword(word.text)),
                _ => false,
            })
        });

        let mut state = ParseState {
            parser: self,
            tokens: &tokens,
            pos: 0,
            drop_stopwords,
        };
        let query = state.parse_all()?.unwrap_or(Query::MatchNothing);
        let spelling_suggestion = self.spelling_suggestion(expression, &tokens);

        log::debug!("parsed '{expression}' into {query}");
        Ok(Some(ParsedQuery {
            query,
            spelling_suggestion,
        }))
    }

    /// Split `field:value` when `field` is a searchable prefix.
    fn qualified<'a>(&self, text: &'a str) -> Option<(&'a str, &'a str)> {
        text.split_once(':')
            .filter(|(field, _)| self.prefixes.contains_key(*field))
    }

    fn spelling_suggestion(&self, expression: &str, tokens: &[Token<'_>]) -> Option<String> {
        let (Some(_), Some(reader)) = (&self.stemming, &self.reader) else {
            return None;
        };

        let mut corrected = String::new();
        let mut last = 0;
        for token in tokens {
            let Token::Word { text, start } = *token else {
                continue;
            };
            let (value, offset) = match self.qualified(text) {
                Some((field, rest)) => {
                    if field == INDEXED_CLASS || rest.contains("..") {
                        continue;
                    }
                    (rest, start + field.len() + 1)
                }
                None => (text, start),
            };
            if value.ends_with('*') {
                continue;
            }
            for word in words(value) {
                if word.text.chars().any(char::is_numeric) {
                    continue;
                }
                if let Some(suggestion) = reader.spelling_suggestion(&word.term) {
                    let begin = offset + word.offset;
                    corrected.push_str(&expression[last..begin]);
                    corrected.push_str(&suggestion);
                    last = begin + word.text.len();
                }
            }
        }

        if last == 0 {
            return None;
        }
        corrected.push_str(&expression[last..]);
        Some(corrected)
    }
}

impl fmt::Debug for QueryParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryParser")
            .field("prefixes", &self.prefixes.keys().collect::<Vec<_>>())
            .field("ranges", &self.ranges.keys().collect::<Vec<_>>())
            .field("stemming", &self.stemming.as_ref().map(|s| s.code().to_string()))
            .field("has_reader", &self.reader.is_some())
            .field("default_operator", &self.default_operator)
            .finish()
    }
}

struct ParseState<'p, 'a> {
    parser: &'p QueryParser,
    tokens: &'p [Token<'a>],
    pos: usize,
    drop_stopwords: bool,
}

impl<'a> ParseState<'_, 'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).copied();
        self.pos += 1;
        token
    }

    /// Top level: stray closing parentheses are skipped.
    fn parse_all(&mut self) -> Result<Option<Query>> {
        let mut parts = Vec::new();
        while self.pos < self.tokens.len() {
            if let Some(query) = self.parse_or()? {
                parts.push(query);
            }
            if self.peek() == Some(Token::RParen) {
                self.pos += 1;
            }
        }
        Ok(self.join(parts))
    }

    fn parse_or(&mut self) -> Result<Option<Query>> {
        let mut parts = Vec::new();
        parts.extend(self.parse_and()?);
        while self.peek() == Some(Token::Or) {
            self.pos += 1;
            parts.extend(self.parse_and()?);
        }
        Ok(match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Query::or(parts)),
        })
    }

    fn parse_and(&mut self) -> Result<Option<Query>> {
        let mut positive: Option<Query> = None;
        let mut negative = Vec::new();
        let mut explicit_and = false;

        loop {
            match self.peek() {
                None | Some(Token::Or) | Some(Token::RParen) => break,
                Some(Token::And) => {
                    self.pos += 1;
                    explicit_and = true;
                    continue;
                }
                _ => {}
            }

            let (negated, query) = self.parse_unary()?;
            if let Some(query) = query {
                if negated {
                    negative.push(query);
                } else {
                    positive = Some(match positive.take() {
                        None => query,
                        Some(acc)
                            if explicit_and
                                || self.parser.default_operator == DefaultOperator::And =>
                        {
                            Query::and(vec![acc, query])
                        }
                        Some(acc) => Query::or(vec![acc, query]),
                    });
                }
            }
            explicit_and = false;
        }

        Ok(match (positive, negative.is_empty()) {
            (positive, true) => positive,
            (positive, false) => Some(Query::and_not(
                positive.unwrap_or(Query::MatchAll),
                Query::or(negative),
            )),
        })
    }

    fn parse_unary(&mut self) -> Result<(bool, Option<Query>)> {
        match self.advance() {
            Some(Token::Not) | Some(Token::Exclude) => {
                let (_, query) = self.parse_unary()?;
                Ok((true, query))
            }
            Some(Token::LParen) => {
                let query = self.parse_or()?;
                if self.peek() == Some(Token::RParen) {
                    self.pos += 1;
                }
                Ok((false, query))
            }
            Some(Token::Word { text, .. }) => Ok((false, self.word_query(text)?)),
            _ => Ok((false, None)),
        }
    }

    fn join(&self, parts: Vec<Query>) -> Option<Query> {
        match parts.len() {
            0 => None,
            _ if self.parser.default_operator == DefaultOperator::And => Some(Query::and(parts)),
            _ => Some(Query::or(parts)),
        }
    }

    fn word_query(&self, text: &str) -> Result<Option<Query>> {
        if let Some((field, rest)) = self.parser.qualified(text) {
            if field == INDEXED_CLASS {
                let class = rest.trim_matches('"');
                return Ok((!class.is_empty()).then(|| Query::term(class_term(class))));
            }
            if rest.contains("..")
                && let Some(processor) = self.parser.ranges.get(field)
            {
                return processor.process(field, rest).map(Some);
            }
            let prefix = &self.parser.prefixes[field];
            return Ok(self.text_query(rest, prefix));
        }
        Ok(self.text_query(text, ""))
    }

    fn text_query(&self, text: &str, prefix: &str) -> Option<Query> {
        let phrase = text.len() >= 2 && text.starts_with('"');
        let text = text.trim_matches('"');

        if !phrase && text.ends_with('*') {
            if let [word] = words(text).as_slice() {
                return Some(Query::Wildcard {
                    prefix: prefix.to_string(),
                    pattern: word.term.clone(),
                    max_expansion: self.parser.max_expansion,
                });
            }
        }

        let stemming = self.parser.stemming.as_deref();
        let plain = words(text);
        let stems = match stemming {
            Some(stemming) if !phrase => stemming.stemmed_words(text),
            _ => Vec::new(),
        };
        let terms: Vec<Query> = plain
            .iter()
            .enumerate()
            .filter(|(_, word)| {
                phrase
                    || !self.drop_stopwords
                    || stemming.is_none_or(|stemming| !stemming.is_stopword(word.text))
            })
            .map(|(i, word)| match stems.get(i) {
                Some(stem) if !starts_uppercase(word.text) => {
                    Query::term(format!("{STEM_PREFIX}{prefix}{}", stem.term))
                }
                _ => Query::term(format!("{prefix}{}", word.term)),
            })
            .collect();

        match terms.len() {
            0 => None,
            _ => Some(Query::and(terms)),
        }
    }
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

// ============================================================================
// Tests
// ============================================================================
