//! Key and term naming utilities.
//!
//! - [`ids`]: unique document keys
//! - [`terms`]: term prefixes shared by the indexer and the query parser

pub mod ids;
pub mod terms;
