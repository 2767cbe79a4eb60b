use crate::db::{Database, execute};
use crate::error::{ErrorKind, Result};
use crate::rows::{Maker, Row, Statement, record_rows};
use exn::ResultExt;
use gearbase_catalog::Dataset;
use gearbase_records::Record;
use gearbase_validate::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::instrument;

/// Builds the store from scratch.
///
/// Any existing store at `path` is removed first. All rows are written in one
/// transaction: manufacturers, then software and hardware with their child
/// rows, then the full-text rows, then metadata. Any record that cannot be
/// materialized aborts the build.
///
/// Returns the number of records written.
#[instrument(skip_all, fields(store = %path.display()))]
pub async fn rebuild(ctx: &Context, path: &Path, dataset_version: Option<&str>) -> Result<usize> {
    let records = load_records(ctx.dataset())?;
    let makers = makers(&records)?;

    let mut data = Vec::new();
    let mut search = Vec::new();
    for record in &records {
        let maker = record.manufacturer().and_then(|slug| makers.get(slug));
        let rows = record_rows(record, ctx.registry(), maker)?;
        data.extend(rows.parents.into_iter().chain(rows.children).map(Statement::Insert));
        search.push(Statement::Insert(rows.search));
    }
    let metadata = metadata_rows(dataset_version, Some(records.len()))?.into_iter().map(Statement::Insert);

    remove_store(path)?;
    let db = Database::connect(path).await?;
    let mut tx = db.pool().begin().await.or_raise(|| ErrorKind::Database)?;
    for statement in data.iter().chain(&search) {
        execute(&mut tx, statement).await?;
    }
    for statement in metadata {
        execute(&mut tx, &statement).await?;
    }
    tx.commit().await.or_raise(|| ErrorKind::Database)?;
    db.close().await;

    tracing::info!(records = records.len(), rows = data.len() + search.len(), "Rebuilt store");
    Ok(records.len())
}

/// Parses every record in dependency order, stopping at the first failure.
fn load_records(dataset: &Dataset) -> Result<Vec<Record>> {
    let files = dataset.all_record_files().or_raise(|| ErrorKind::Dataset)?;
    let mut records = Vec::with_capacity(files.len());
    for file in files {
        let text = dataset.read(&file).or_raise(|| ErrorKind::Io(file.path.clone()))?;
        let record = Record::parse(file.collection, file.slug.as_str(), &text)
            .or_raise(|| ErrorKind::Record { collection: file.collection, slug: file.slug.clone() })?;
        records.push(record);
    }
    Ok(records)
}

fn makers(records: &[Record]) -> Result<BTreeMap<String, Maker>> {
    let mut makers = BTreeMap::new();
    for record in records {
        if let Some(maker) = Maker::of(record)? {
            makers.insert(record.slug.clone(), maker);
        }
    }
    Ok(makers)
}

/// Rows of the `metadata` table. The record count is left out when the caller
/// cannot know it.
pub(crate) fn metadata_rows(dataset_version: Option<&str>, record_count: Option<usize>) -> Result<Vec<Row>> {
    let built_at = OffsetDateTime::now_utc().format(&Rfc3339).or_raise(|| ErrorKind::Timestamp)?;
    let mut rows = Vec::new();
    if let Some(version) = dataset_version {
        rows.push(Row::new("metadata").with("key", "dataset_version").with("value", version));
    }
    rows.push(Row::new("metadata").with("key", "built_at").with("value", built_at));
    if let Some(count) = record_count {
        rows.push(Row::new("metadata").with("key", "record_count").with("value", count.to_string()));
    }
    Ok(rows)
}

fn remove_store(path: &Path) -> Result<()> {
    let journal = path.with_file_name(format!(
        "{}-journal",
        path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default()
    ));
    for file in [path, journal.as_path()] {
        if file.exists() {
            fs::remove_file(file).or_raise(|| ErrorKind::Io(file.to_path_buf()))?;
            tracing::debug!(path = %file.display(), "Removed previous store file");
        }
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).or_raise(|| ErrorKind::Io(parent.to_path_buf()))?;
    }
    Ok(())
}
