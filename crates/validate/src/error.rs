//! Validation Error Types
//!
//! Validation *findings* are data ([`Issue`](crate::Issue)); these errors are
//! for runs that cannot proceed at all.

use derive_more::{Display, Error};

/// A validation run error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for validation runs.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The vocabulary files could not be loaded.
    #[display("schema registry unavailable")]
    Registry,
    /// The dataset directory could not be read.
    #[display("dataset unavailable")]
    Dataset,
    /// The baseline could not be compared against.
    #[display("baseline comparison failed")]
    Baseline,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Dataset | Self::Baseline)
    }
}
