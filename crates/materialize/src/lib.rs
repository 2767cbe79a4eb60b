//! Relational materializer for gearbase.
//!
//! Turns a validated dataset into a SQLite store: typed tables per collection,
//! child tables for nested lists, FTS5 shadow tables for search, and a
//! `metadata` table. The store is either rebuilt from scratch ([`rebuild`]) or
//! brought forward from a baseline with a timestamped SQL patch
//! ([`generate_patch`], [`apply_patch`]). Both paths share one field mapping
//! ([`rows`]) and converge on identical rows.

mod db;
pub mod error;
mod patch;
mod rebuild;
pub mod rows;
pub mod sql;

pub use crate::db::Database;
pub use crate::patch::{Patch, apply_patch, generate_patch};
pub use crate::rebuild::rebuild;

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use gearbase_catalog::Baseline;
use gearbase_validate::{Context, validate_dataset};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// What [`build`] did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rebuilt { records: usize },
    Patched { path: PathBuf, statements: usize },
    /// The dataset matches the baseline; no patch was written.
    Unchanged,
}

/// Validates the dataset, then materializes it.
///
/// Without a baseline the store is rebuilt. With one, a patch is generated,
/// written to `patches` and applied to the existing store. Nothing is written
/// if validation reports any issue.
#[instrument(skip_all, fields(store = %store.display()))]
pub async fn build(ctx: &Context, store: &Path, patches: &Path, baseline: Option<&dyn Baseline>) -> Result<Outcome> {
    let report = validate_dataset(ctx, baseline).or_raise(|| ErrorKind::Dataset)?;
    if !report.passed() {
        tracing::warn!(issues = report.issue_count(), records = report.failed_records(), "Dataset failed validation");
        exn::bail!(ErrorKind::Invalid(report.issue_count()));
    }

    let Some(baseline) = baseline else {
        let records = rebuild(ctx, store, ctx.dataset_version()).await?;
        return Ok(Outcome::Rebuilt { records });
    };
    if !store.is_file() {
        exn::bail!(ErrorKind::StoreNotFound(store.to_path_buf()));
    }
    let patch = generate_patch(ctx, baseline, ctx.dataset_version())?;
    if patch.is_empty() {
        tracing::info!("Store is up to date");
        return Ok(Outcome::Unchanged);
    }
    let path = patch.write_to(patches)?;
    apply_patch(store, &patch).await?;
    Ok(Outcome::Patched { path, statements: patch.statements.len() })
}
