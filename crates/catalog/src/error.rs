//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use gearbase_records::Collection;
use std::fmt::{Display as FmtDisplay, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// One slug claimed by more than one record file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugConflict {
    pub slug: String,
    /// Every file claiming the slug, relative to the dataset root.
    pub paths: Vec<PathBuf>,
}
impl FmtDisplay for SlugConflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let paths: Vec<String> = self.paths.iter().map(|p| p.display().to_string()).collect();
        write!(f, "'{}' is claimed by {}", self.slug, paths.join(", "))
    }
}

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reading or writing a file failed.
    #[display("I/O error: {}", _0.display())]
    Io(#[error(not(source))] PathBuf),
    /// Path escapes the dataset root or is otherwise unusable.
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// The same slug is used by more than one record file.
    #[display(
        "slug conflicts: {}",
        _0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    SlugConflict(#[error(not(source))] Vec<SlugConflict>),
    /// A new record tried to take a slug that is already in use.
    #[display("slug '{slug}' is already taken in {collection}")]
    SlugTaken { slug: String, collection: Collection },
    /// The slug index file is not a valid `{ slug: collection }` map.
    #[display("malformed slug index: {}", _0.display())]
    MalformedIndex(#[error(not(source))] PathBuf),
    /// A record file could not be parsed far enough to read its id.
    #[display("malformed record: {}", _0.display())]
    MalformedRecord(#[error(not(source))] PathBuf),
    /// `git` is not installed or not on the `PATH`.
    #[display("git executable not found")]
    GitNotFound,
    /// A `git` invocation failed.
    #[display("git failed: {_0}")]
    Git(#[error(not(source))] String),
    /// The id migration mapping file already exists.
    #[display("id migration already applied: {}", _0.display())]
    MigrationAlreadyApplied(#[error(not(source))] PathBuf),
    /// No record carries a legacy id.
    #[display("no legacy ids to migrate")]
    NothingToMigrate,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
