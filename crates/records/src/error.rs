//! Record Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A record error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for record operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The document is not parseable YAML at all.
    #[display("invalid YAML: {message}")]
    Syntax {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },
    /// The document parsed, but its top level is not a mapping.
    #[display("record is not a mapping")]
    NotAMapping,
    /// The document does not match the shape of its collection.
    #[display("record does not match the {_0} schema")]
    Schema(#[error(not(source))] &'static str),
    /// The `id` field is present but is neither a string nor a non-negative integer.
    #[display("invalid id: {_0}")]
    InvalidId(#[error(not(source))] String),
    /// The name does not correspond to any known collection.
    #[display("unknown collection: {_0}")]
    UnknownCollection(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Records are plain text on disk; the same input always fails the same way.
        false
    }
}
