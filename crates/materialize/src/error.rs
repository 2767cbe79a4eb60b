//! Materializer Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use gearbase_records::Collection;
use std::path::PathBuf;

/// A materialization error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for materialization.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// The store to patch does not exist.
    #[display("store not found: {}", _0.display())]
    StoreNotFound(#[error(not(source))] PathBuf),
    /// Reading or writing a file failed.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// The dataset or its baseline could not be read.
    #[display("dataset unavailable")]
    Dataset,
    /// A record could not be parsed into its typed form.
    #[display("unreadable record: {collection}/{slug}")]
    Record { collection: Collection, slug: String },
    /// Rows are keyed by record id; run id assignment first.
    #[display("record has no id: {collection}/{slug}")]
    MissingId { collection: Collection, slug: String },
    /// A product names a manufacturer that has no record.
    #[display("unknown manufacturer '{manufacturer}' for {slug}")]
    UnknownManufacturer { slug: String, manufacturer: String },
    #[display("could not format timestamp")]
    Timestamp,
    /// The dataset has validation issues; nothing was written.
    #[display("dataset failed validation with {_0} issues")]
    Invalid(#[error(not(source))] usize),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database | Self::Io(_))
    }
}
