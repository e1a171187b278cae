//! Error types for quill.
//!
//! The variants fall into the groups callers usually branch on:
//!
//! - configuration errors: schema setup, codec or blueprint resolution
//! - value errors: a codec could not encode or decode a specific value
//! - range errors: a page outside the result window was requested
//! - unsupported operations: e.g. reindexing a class inside a transaction
//!
//! None of them are retried by quill itself.

/// Errors that can occur while mapping objects onto an index.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Generic configuration problem (unknown adapter, unknown writer, ...).
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// A type tag without a registered codec.
    #[error("No codec registered for type '{tag}'")]
    UnknownTypeTag {
        /// The unresolved tag
        tag: String,
    },

    /// The same attribute was declared with two different types.
    #[error(
        "Attribute '{attribute}' is declared as '{declared}' but already registered as '{existing}'"
    )]
    AmbiguousType {
        /// Attribute name
        attribute: String,
        /// Type tag already present in another blueprint
        existing: String,
        /// Type tag of the rejected declaration
        declared: String,
    },

    /// An attribute name clashes with a document accessor.
    #[error("'{name}' is a reserved name and cannot be used as an attribute")]
    ReservedName {
        /// The rejected name
        name: String,
    },

    /// Neither the class nor any of its ancestors has a blueprint.
    #[error("No blueprint registered for class '{class}' or any of its ancestors")]
    BlueprintNotFound {
        /// Class that was looked up
        class: String,
    },

    /// An attribute that no blueprint declares.
    #[error("Attribute '{name}' is not registered in any blueprint")]
    UnknownAttribute {
        /// Attribute name
        name: String,
    },

    /// A stemming language code that cannot be resolved.
    #[error("Unsupported language: {code}")]
    UnsupportedLanguage {
        /// The language code from configuration
        code: String,
    },

    /// A value could not be encoded or decoded.
    #[error("Value error: {message}")]
    Value {
        /// What went wrong
        message: String,
    },

    /// A codec received a value of the wrong kind.
    #[error("Type error: expected {expected}, got {found}")]
    Type {
        /// Kind the codec accepts
        expected: &'static str,
        /// Kind that was passed
        found: String,
    },

    /// A page outside the result window.
    #[error("Page {page} is out of range (total pages: {total_pages})")]
    PageOutOfRange {
        /// Requested page (1-based)
        page: usize,
        /// Number of pages in the resultset
        total_pages: usize,
    },

    /// An operation rejected in the current indexing context.
    #[error("Unsupported operation: {operation}")]
    Unsupported {
        /// Description of the rejected operation
        operation: String,
    },

    /// A query string the parser cannot translate.
    #[error("Query parse error: {message}")]
    QueryParse {
        /// What went wrong
        message: String,
    },

    /// Failure reported by the underlying search engine.
    #[error("Engine error: {message}")]
    Engine {
        /// What went wrong
        message: String,
    },

    /// I/O error (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML configuration could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Convenience `Result` type alias for quill operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether this error comes from schema or runtime configuration.
    ///
    /// Configuration errors are fatal to the operation that triggered them.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::UnknownTypeTag { .. }
                | Error::AmbiguousType { .. }
                | Error::ReservedName { .. }
                | Error::BlueprintNotFound { .. }
                | Error::UnknownAttribute { .. }
                | Error::UnsupportedLanguage { .. }
                | Error::ConfigParse(_)
        )
    }

    /// Returns whether this error was raised by a codec.
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            Error::Value { .. } | Error::Type { .. } | Error::Serialization(_)
        )
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a new value error.
    pub fn value<S: Into<String>>(message: S) -> Self {
        Error::Value {
            message: message.into(),
        }
    }

    /// Creates a new type error for a codec that expected `expected`.
    pub fn type_mismatch<S: Into<String>>(expected: &'static str, found: S) -> Self {
        Error::Type {
            expected,
            found: found.into(),
        }
    }

    /// Creates a new unsupported-operation error.
    pub fn unsupported<S: Into<String>>(operation: S) -> Self {
        Error::Unsupported {
            operation: operation.into(),
        }
    }

    /// Creates a new query parse error.
    pub fn query_parse<S: Into<String>>(message: S) -> Self {
        Error::QueryParse {
            message: message.into(),
        }
    }

    /// Creates a new engine error.
    pub fn engine<S: Into<String>>(message: S) -> Self {
        Error::Engine {
            message: message.into(),
        }
    }

    /// Creates a blueprint lookup error.
    pub fn blueprint_not_found<S: Into<String>>(class: S) -> Self {
        Error::BlueprintNotFound {
            class: class.into(),
        }
    }
}
