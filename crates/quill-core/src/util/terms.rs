//! Term prefix conventions.
//!
//! Terms are plain strings. Field-qualified terms start with an upper-case
//! prefix derived from the field name, which keeps them apart from the
//! lower-case free-text vocabulary:
//!
//! | Prefix | Meaning |
//! |--------|---------|
//! | `X<FIELD>` | field-qualified term |
//! | `XINDEXED_CLASS` | class marker |
//! | `Q` | unique key |
//! | `Z` | stemmed form (followed by an optional field prefix) |

/// Name of the pseudo attribute stored in slot 0.
pub const INDEXED_CLASS: &str = "indexed_class";

/// Prefix of unique-key terms.
pub const UNIQUE_PREFIX: &str = "Q";

/// Prefix of stemmed terms.
pub const STEM_PREFIX: &str = "Z";

/// Term prefix for a searchable field.
///
/// # Examples
///
/// ```
/// use quill_core::util::terms::field_prefix;
///
/// assert_eq!(field_prefix("name"), "XNAME");
/// assert_eq!(field_prefix("indexed_class"), "XINDEXED_CLASS");
/// ```
pub fn field_prefix(field: &str) -> String {
    format!("X{}", field.to_uppercase())
}

/// The class-marker term for a class.
///
/// # Examples
///
/// ```
/// use quill_core::util::terms::class_term;
///
/// assert_eq!(class_term("Person"), "XINDEXED_CLASSperson");
/// ```
pub fn class_term(class: &str) -> String {
    format!("{}{}", field_prefix(INDEXED_CLASS), class.to_lowercase())
}

/// The unique-key term for a document key.
pub fn unique_term(key: &str) -> String {
    format!("{UNIQUE_PREFIX}{key}")
}

/// Returns `true` for free-text terms (no prefix).
pub fn is_unprefixed(term: &str) -> bool {
    term.chars().next().is_some_and(|c| !c.is_uppercase())
}
