//! Unique key utilities.
//!
//! Every indexed object is identified by a key of the form `<Class>-<id>`.
//! The key is stored as the document payload and as the unique term that
//! guarantees one document per object.

/// Separator between class name and object id in a unique key.
pub const KEY_SEPARATOR: char = '-';

/// Build the unique key for an object.
///
/// # Examples
///
/// ```
/// use quill_core::util::ids::unique_key;
///
/// assert_eq!(unique_key("Person", "42"), "Person-42");
/// assert_eq!(unique_key("  Person ", " 42 "), "Person-42");
/// ```
pub fn unique_key(class: &str, id: &str) -> String {
    format!("{}{KEY_SEPARATOR}{}", class.trim(), id.trim())
}

/// Split a unique key back into class name and id.
///
/// Splits at the first separator, so ids may themselves contain hyphens.
/// Returns `None` when either part is empty.
///
/// # Examples
///
/// ```
/// use quill_core::util::ids::split_key;
///
/// assert_eq!(split_key("Person-42"), Some(("Person", "42")));
/// assert_eq!(split_key("Order-2020-17"), Some(("Order", "2020-17")));
/// assert_eq!(split_key("Person"), None);
/// ```
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    let (class, id) = key.split_once(KEY_SEPARATOR)?;
    if class.is_empty() || id.is_empty() {
        None
    } else {
        Some((class, id))
    }
}
