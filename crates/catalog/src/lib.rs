//! Dataset-level bookkeeping for gearbase.
//!
//! - [`Dataset`]: the on-disk layout of record files.
//! - [`SlugIndex`]: the global `slug → collection` map and its JSON file.
//! - [`ids`]: identifier assignment, immutability checks and the legacy migration.
//! - [`baseline`]: prior revisions (git or a snapshot directory) to diff against.

pub mod baseline;
mod dataset;
pub mod error;
pub mod ids;
mod path;
mod slugs;

pub use crate::baseline::{Baseline, Change, ChangeKind, DirectoryBaseline, GitBaseline};
pub use crate::dataset::{Dataset, ID_MIGRATION_FILE, RECORD_EXTENSIONS, RecordFile, SLUG_INDEX_FILE};
pub use crate::error::SlugConflict;
pub use crate::path::validate as validate_path;
pub use crate::slugs::{SlugIndex, SlugScan};
