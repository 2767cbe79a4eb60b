//! Schema Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A schema error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// Every variant is fatal for a validation run: no record can be checked
/// against a partial vocabulary.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A vocabulary file could not be read.
    #[display("cannot read vocabulary file: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// A vocabulary file is not valid YAML or has the wrong shape.
    #[display("malformed vocabulary file: {}", _0.display())]
    Malformed(#[error(not(source))] PathBuf),
    /// A vocabulary that must not be empty is empty.
    #[display("empty vocabulary: {_0}")]
    Empty(#[error(not(source))] &'static str),
    /// An alias points at a category that is not canonical.
    #[display("alias '{alias}' resolves to unknown category '{target}'")]
    UnknownAliasTarget { alias: String, target: String },
    /// A value appears both as a canonical category and as an alias.
    #[display("'{_0}' is both a canonical category and an alias")]
    AmbiguousAlias(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io(_))
    }
}
