//! Engine-neutral query tree.
//!
//! The query parser produces a [`Query`]; engines evaluate it. Terms are
//! full index terms (prefix included).

use std::fmt;

/// A query over the index.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Every document.
    MatchAll,
    /// No document.
    MatchNothing,
    /// Documents indexed by `term`.
    Term {
        /// Full term, prefix included.
        term: String,
        /// Query-side weight multiplier.
        wqf: u32,
    },
    /// Any term starting with `prefix + pattern`.
    Wildcard {
        /// Field prefix (empty for free text).
        prefix: String,
        /// Lowercased word stem without the `*`.
        pattern: String,
        /// Maximum number of terms to expand to.
        max_expansion: Option<usize>,
    },
    /// Documents whose value slot lies in `[lower, upper]` (string order).
    ValueRange {
        /// Value slot.
        slot: u32,
        /// Inclusive lower bound, open if `None`.
        lower: Option<String>,
        /// Inclusive upper bound, open if `None`.
        upper: Option<String>,
    },
    /// All subqueries must match.
    And(Vec<Query>),
    /// Any subquery may match.
    Or(Vec<Query>),
    /// Left matches and right does not.
    AndNot(Box<Query>, Box<Query>),
    /// Left, restricted to documents matching right. Right adds no weight.
    Filter(Box<Query>, Box<Query>),
}

impl Query {
    /// A single term with weight 1.
    pub fn term(term: impl Into<String>) -> Self {
        Query::Term {
            term: term.into(),
            wqf: 1,
        }
    }

    /// A value range.
    pub fn range(slot: u32, lower: Option<String>, upper: Option<String>) -> Self {
        Query::ValueRange { slot, lower, upper }
    }

    /// Conjunction, flattening nested conjunctions.
    pub fn and(queries: Vec<Query>) -> Self {
        combine(queries, Query::And, |q| match q {
            Query::And(inner) => Ok(inner),
            other => Err(other),
        })
    }

    /// Disjunction, flattening nested disjunctions.
    pub fn or(queries: Vec<Query>) -> Self {
        combine(queries, Query::Or, |q| match q {
            Query::Or(inner) => Ok(inner),
            other => Err(other),
        })
    }

    /// `positive` without `negative`.
    pub fn and_not(positive: Query, negative: Query) -> Self {
        Query::AndNot(Box::new(positive), Box::new(negative))
    }

    /// `query` restricted to `filter`.
    pub fn filter(query: Query, filter: Query) -> Self {
        Query::Filter(Box::new(query), Box::new(filter))
    }
}

fn combine<F>(queries: Vec<Query>, wrap: fn(Vec<Query>) -> Query, unwrap: F) -> Query
where
    F: Fn(Query) -> std::result::Result<Vec<Query>, Query>,
{
    let mut flat = Vec::with_capacity(queries.len());
    for query in queries {
        match unwrap(query) {
            Ok(inner) => flat.extend(inner),
            Err(other) => flat.push(other),
        }
    }
    match flat.len() {
        0 => Query::MatchNothing,
        1 => flat.remove(0),
        _ => wrap(flat),
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, parts: &[Query], op: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{part}")?;
            }
            f.write_str(")")
        }

        match self {
            Query::MatchAll => f.write_str("<alldocuments>"),
            Query::MatchNothing => f.write_str("<nothing>"),
            Query::Term { term, wqf: 1 } => f.write_str(term),
            Query::Term { term, wqf } => write!(f, "{term}#{wqf}"),
            Query::Wildcard {
                prefix, pattern, ..
            } => write!(f, "WILDCARD {prefix}{pattern}*"),
            Query::ValueRange { slot, lower, upper } => write!(
                f,
                "VALUE_RANGE {slot} {} {}",
                lower.as_deref().unwrap_or("-"),
                upper.as_deref().unwrap_or("-")
            ),
            Query::And(parts) => join(f, parts, "AND"),
            Query::Or(parts) => join(f, parts, "OR"),
            Query::AndNot(left, right) => write!(f, "({left} AND_NOT {right})"),
            Query::Filter(left, right) => write!(f, "({left} FILTER {right})"),
        }
    }
}
