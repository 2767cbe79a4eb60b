//! Incremental patches between two dataset revisions.

use crate::db::Database;
use crate::error::{ErrorKind, Result};
use crate::rebuild::metadata_rows;
use crate::rows::{Maker, RecordRows, Statement, child_tables, record_rows};
use crate::sql::Value;
use exn::ResultExt;
use gearbase_catalog::ids::read_id;
use gearbase_catalog::{Baseline, ChangeKind, Dataset};
use gearbase_records::{Collection, Record};
use gearbase_validate::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::instrument;

const RECORD_COUNT: &str = "INSERT INTO metadata (key, value) SELECT 'record_count', CAST(COUNT(*) AS TEXT) FROM records \
                            WHERE true ON CONFLICT(key) DO UPDATE SET value = excluded.value;";

/// Ordered statements that move a store from the baseline's content to the
/// dataset's.
#[derive(Debug, Clone)]
pub struct Patch {
    pub created_at: OffsetDateTime,
    pub statements: Vec<Statement>,
    /// Records left out because they could not be materialized, and deleted
    /// records whose baseline id could not be read.
    pub skipped: Vec<(Collection, String)>,
    dataset_version: Option<String>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// The patch as one SQL transaction, ending with a metadata update.
    pub fn to_sql(&self) -> Result<String> {
        let metadata = metadata_rows(self.dataset_version.as_deref(), None)?;
        let mut sql = String::from("BEGIN TRANSACTION;\n");
        let upserts = metadata.into_iter().map(|row| Statement::Upsert { row, key: "key" });
        for statement in self.statements.iter().cloned().chain(upserts) {
            sql.push_str(&statement.render());
            sql.push('\n');
        }
        sql.push_str(RECORD_COUNT);
        sql.push_str("\nCOMMIT;\n");
        Ok(sql)
    }

    /// `patch-<yyyymmdd>T<hhmmss>Z.sql`, from the creation time in UTC.
    pub fn file_name(&self) -> Result<String> {
        let format = format_description!("[year][month][day]T[hour][minute][second]Z");
        let stamp = self.created_at.format(&format).or_raise(|| ErrorKind::Timestamp)?;
        Ok(format!("patch-{stamp}.sql"))
    }

    /// Writes the patch into `dir`, returning the file's path.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).or_raise(|| ErrorKind::Io(dir.to_path_buf()))?;
        let path = dir.join(self.file_name()?);
        fs::write(&path, self.to_sql()?).or_raise(|| ErrorKind::Io(path.clone()))?;
        tracing::info!(path = %path.display(), statements = self.statements.len(), "Wrote patch");
        Ok(path)
    }
}

/// Computes the patch from `baseline` to the context's dataset.
///
/// Added and modified records are upserted in dependency order; their parent
/// rows are updated in place so that nothing cascades onto dependents, and
/// their child rows are replaced. Deleted records are removed afterwards in
/// reverse dependency order, keyed by their id in the baseline. Records that
/// cannot be read or materialized are skipped with a warning.
#[instrument(skip_all, fields(root = %ctx.dataset().root().display()))]
pub fn generate_patch(ctx: &Context, baseline: &dyn Baseline, dataset_version: Option<&str>) -> Result<Patch> {
    let dataset = ctx.dataset();
    let changes = baseline.changes(dataset).or_raise(|| ErrorKind::Dataset)?;
    let mut makers = Makers::new(dataset);
    let mut patch = Patch {
        created_at: OffsetDateTime::now_utc(),
        statements: Vec::new(),
        skipped: Vec::new(),
        dataset_version: dataset_version.map(str::to_string),
    };

    // Ids written by this patch, and the collection they now belong to.
    let mut written: BTreeMap<String, Collection> = BTreeMap::new();
    let mut renamed_makers = BTreeSet::new();
    let mut removals: Vec<(Collection, String)> = Vec::new();

    for change in &changes {
        let old_id = match change.kind {
            ChangeKind::Added => None,
            ChangeKind::Modified | ChangeKind::Deleted => match baseline_id(baseline, change.collection, &change.slug) {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!(collection = %change.collection, slug = %change.slug, error = ?err, "Could not read baseline id");
                    if change.kind == ChangeKind::Deleted {
                        // Its row, if any, cannot be located and stays in the store.
                        patch.skipped.push((change.collection, change.slug.clone()));
                        continue;
                    }
                    None
                },
            },
        };
        if change.kind == ChangeKind::Deleted {
            match old_id {
                Some(id) => removals.push((change.collection, id)),
                None => tracing::warn!(collection = %change.collection, slug = %change.slug, "Deleted record had no id"),
            }
            continue;
        }

        let Some(record) = current_record(dataset, change.collection, &change.slug) else {
            patch.skipped.push((change.collection, change.slug.clone()));
            continue;
        };
        let maker = match record.manufacturer() {
            Some(slug) => makers.get(slug),
            None => None,
        };
        let rows = match record_rows(&record, ctx.registry(), maker.as_ref()) {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(collection = %change.collection, slug = %change.slug, error = %*err, "Skipping record");
                patch.skipped.push((change.collection, change.slug.clone()));
                continue;
            },
        };
        if let Some(old) = old_id
            && old != rows.id
        {
            removals.push((change.collection, old));
        }
        if change.kind == ChangeKind::Modified
            && change.collection == Collection::Manufacturers
            && maker_renamed(baseline, &record)
        {
            renamed_makers.insert(record.slug.clone());
        }
        written.insert(rows.id.clone(), change.collection);
        patch.statements.extend(upsert(change.collection, rows));
    }

    if !renamed_makers.is_empty() {
        let changed: BTreeSet<(Collection, &str)> = changes.iter().map(|c| (c.collection, c.slug.as_str())).collect();
        for collection in [Collection::Software, Collection::Hardware] {
            for file in dataset.record_files(collection).or_raise(|| ErrorKind::Dataset)? {
                if changed.contains(&(collection, file.slug.as_str())) {
                    continue;
                }
                let Some(record) = current_record(dataset, collection, &file.slug) else { continue };
                let Some(slug) = record.manufacturer().filter(|slug| renamed_makers.contains(*slug)) else {
                    continue;
                };
                let maker = makers.get(slug);
                if let Ok(rows) = record_rows(&record, ctx.registry(), maker.as_ref()) {
                    tracing::debug!(%collection, slug = %record.slug, "Refreshing search row for renamed manufacturer");
                    patch.statements.push(delete_search(collection, &rows.id));
                    patch.statements.push(Statement::Insert(rows.search));
                }
            }
        }
    }

    removals.sort_by(|a, b| b.0.cmp(&a.0));
    for (collection, id) in removals {
        match written.get(&id) {
            // Same record under a new file name; already rewritten in place.
            Some(now) if *now == collection => {},
            // Moved to another collection: drop only what the old one owned.
            Some(_) => {
                patch.statements.push(delete_search(collection, &id));
                patch.statements.push(Statement::Delete {
                    table: collection.table(),
                    column: "id",
                    value: Value::from(id.as_str()),
                });
            },
            None => {
                patch.statements.push(delete_search(collection, &id));
                patch.statements.push(Statement::Delete { table: "records", column: "id", value: Value::from(id) });
            },
        }
    }

    tracing::info!(
        changes = changes.len(),
        statements = patch.statements.len(),
        skipped = patch.skipped.len(),
        "Generated patch"
    );
    Ok(patch)
}

/// Executes a patch against an existing store.
#[instrument(skip_all, fields(store = %store.as_ref().display()))]
pub async fn apply_patch(store: impl AsRef<Path>, patch: &Patch) -> Result<()> {
    let db = Database::open(store).await?;
    let sql = patch.to_sql()?;
    let mut conn = db.pool().acquire().await.or_raise(|| ErrorKind::Database)?;
    if let Err(err) = sqlx::raw_sql(&sql).execute(&mut *conn).await {
        // The script's own transaction is still open after a failing statement.
        _ = sqlx::raw_sql("ROLLBACK").execute(&mut *conn).await;
        drop(conn);
        db.close().await;
        return Err(err).or_raise(|| ErrorKind::Database);
    }
    drop(conn);
    db.close().await;
    tracing::info!(statements = patch.statements.len(), "Applied patch");
    Ok(())
}

fn upsert(collection: Collection, rows: RecordRows) -> Vec<Statement> {
    let mut statements: Vec<Statement> =
        rows.parents.into_iter().map(|row| Statement::Upsert { row, key: "id" }).collect();
    for &table in child_tables(collection) {
        statements.push(Statement::Delete { table, column: "owner_id", value: Value::from(rows.id.as_str()) });
    }
    statements.push(delete_search(collection, &rows.id));
    statements.extend(rows.children.into_iter().map(Statement::Insert));
    statements.push(Statement::Insert(rows.search));
    statements
}

fn delete_search(collection: Collection, id: &str) -> Statement {
    Statement::Delete { table: collection.fts_table(), column: "id", value: Value::from(id) }
}

fn current_record(dataset: &Dataset, collection: Collection, slug: &str) -> Option<Record> {
    let parsed = dataset
        .find(collection, slug)
        .ok_or_else(|| "file not found".to_string())
        .and_then(|file| dataset.read(&file).map_err(|err| (*err).to_string()))
        .and_then(|text| Record::parse(collection, slug, &text).map_err(|err| (*err).to_string()));
    match parsed {
        Ok(record) => Some(record),
        Err(error) => {
            tracing::warn!(%collection, slug, %error, "Skipping unreadable record");
            None
        },
    }
}

/// The record's id as of the baseline; `None` when the baseline copy is
/// missing or carries no id.
fn baseline_id(baseline: &dyn Baseline, collection: Collection, slug: &str) -> Result<Option<String>> {
    let Some(text) = baseline.read(collection, slug).or_raise(|| ErrorKind::Dataset)? else {
        return Ok(None);
    };
    let id = read_id(&text).or_raise(|| ErrorKind::Record { collection, slug: slug.to_string() })?;
    Ok(id.map(|id| id.to_string()))
}

/// Whether a manufacturer's display name differs from the baseline's.
fn maker_renamed(baseline: &dyn Baseline, record: &Record) -> bool {
    let before = baseline
        .read(Collection::Manufacturers, &record.slug)
        .ok()
        .flatten()
        .and_then(|text| Record::parse(Collection::Manufacturers, record.slug.as_str(), &text).ok());
    before.is_none_or(|before| before.name() != record.name())
}

/// Current manufacturers, read on first use.
struct Makers<'a> {
    dataset: &'a Dataset,
    cache: BTreeMap<String, Option<Maker>>,
}
impl<'a> Makers<'a> {
    fn new(dataset: &'a Dataset) -> Self {
        Self { dataset, cache: BTreeMap::new() }
    }

    fn get(&mut self, slug: &str) -> Option<Maker> {
        if let Some(maker) = self.cache.get(slug) {
            return maker.clone();
        }
        let maker = current_record(self.dataset, Collection::Manufacturers, slug)
            .and_then(|record| Maker::of(&record).ok().flatten());
        self.cache.insert(slug.to_string(), maker.clone());
        maker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearbase_catalog::{DirectoryBaseline, SlugIndex};
    use gearbase_schema::{Registry, Vocabulary};

    const MOOG_ID: &str = "0b7e1c3a-5f2d-4e8a-9c61-3d2f1a4b5c6d";
    const MINIMOOG_ID: &str = "6a5b4c3d-2e1f-4a0b-9c8d-7e6f5a4b3c2d";

    fn write(root: &Path, file: &str, contents: &str) {
        let path = root.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn context(root: &Path) -> Context {
        let registry = Registry::new(Vocabulary { categories: vec!["synth".into()], ..Vocabulary::default() }).unwrap();
        let dataset = Dataset::open(root).unwrap();
        let slugs = SlugIndex::scan(&dataset).unwrap();
        Context::new(registry, dataset, slugs)
    }

    fn rendered(patch: &Patch) -> Vec<String> {
        patch.statements.iter().map(Statement::render).collect()
    }

    #[test]
    fn test_modification_upserts_and_replaces_children() {
        let before = tempfile::tempdir().unwrap();
        let after = tempfile::tempdir().unwrap();
        write(before.path(), "manufacturers/moog.yaml", &format!("id: {MOOG_ID}\nname: Moog\n"));
        write(after.path(), "manufacturers/moog.yaml", &format!("id: {MOOG_ID}\nname: Moog\ncountry: US\n"));

        let baseline = DirectoryBaseline::new(before.path()).unwrap();
        let patch = generate_patch(&context(after.path()), &baseline, Some("2")).unwrap();
        let sql = rendered(&patch);
        assert!(sql[0].starts_with("INSERT INTO records (id, collection) VALUES"));
        assert!(sql[0].ends_with("ON CONFLICT(id) DO UPDATE SET collection = excluded.collection;"));
        assert!(sql[1].starts_with("INSERT INTO manufacturers"));
        assert!(sql.contains(&format!("DELETE FROM links WHERE owner_id = '{MOOG_ID}';")));
        assert!(sql.contains(&format!("DELETE FROM manufacturers_fts WHERE id = '{MOOG_ID}';")));
        assert!(sql.last().unwrap().starts_with("INSERT INTO manufacturers_fts"));
        assert!(!sql.iter().any(|s| s.starts_with("DELETE FROM records")));

        let text = patch.to_sql().unwrap();
        assert!(text.starts_with("BEGIN TRANSACTION;\n"));
        assert!(text.ends_with("COMMIT;\n"));
        assert!(text.contains("VALUES ('dataset_version', '2')"));
        assert!(text.contains(RECORD_COUNT));
    }

    #[test]
    fn test_deletion_with_unreadable_baseline_id_is_skipped() {
        let before = tempfile::tempdir().unwrap();
        let after = tempfile::tempdir().unwrap();
        write(before.path(), "manufacturers/moog.yaml", &format!("id: {MOOG_ID}\nname: Moog\n"));
        write(before.path(), "hardware/minimoog.yaml", "id: -1\nname: Minimoog\nmanufacturer: moog\n");
        write(after.path(), "manufacturers/moog.yaml", &format!("id: {MOOG_ID}\nname: Moog\n"));

        let baseline = DirectoryBaseline::new(before.path()).unwrap();
        let patch = generate_patch(&context(after.path()), &baseline, None).unwrap();
        assert_eq!(patch.skipped, [(Collection::Hardware, "minimoog".to_string())]);
        assert!(patch.is_empty());
    }

    #[test]
    fn test_deletions_follow_upserts_in_reverse_order() {
        let before = tempfile::tempdir().unwrap();
        let after = tempfile::tempdir().unwrap();
        write(before.path(), "manufacturers/moog.yaml", &format!("id: {MOOG_ID}\nname: Moog\n"));
        write(
            before.path(),
            "hardware/minimoog.yaml",
            &format!("id: {MINIMOOG_ID}\nname: Minimoog\nmanufacturer: moog\n"),
        );
        write(after.path(), "software/broken.yaml", "name: [Broken\n");

        let baseline = DirectoryBaseline::new(before.path()).unwrap();
        let patch = generate_patch(&context(after.path()), &baseline, None).unwrap();
        assert_eq!(patch.skipped, [(Collection::Software, "broken".to_string())]);
        assert_eq!(
            rendered(&patch),
            [
                format!("DELETE FROM hardware_fts WHERE id = '{MINIMOOG_ID}';"),
                format!("DELETE FROM records WHERE id = '{MINIMOOG_ID}';"),
                format!("DELETE FROM manufacturers_fts WHERE id = '{MOOG_ID}';"),
                format!("DELETE FROM records WHERE id = '{MOOG_ID}';"),
            ]
        );
    }

    #[test]
    fn test_renamed_maker_refreshes_product_search_rows() {
        let before = tempfile::tempdir().unwrap();
        let after = tempfile::tempdir().unwrap();
        let minimoog = format!("id: {MINIMOOG_ID}\nname: Minimoog\nmanufacturer: moog\n");
        write(before.path(), "manufacturers/moog.yaml", &format!("id: {MOOG_ID}\nname: Moog\n"));
        write(before.path(), "hardware/minimoog.yaml", &minimoog);
        write(after.path(), "manufacturers/moog.yaml", &format!("id: {MOOG_ID}\nname: Moog Music\n"));
        write(after.path(), "hardware/minimoog.yaml", &minimoog);

        let baseline = DirectoryBaseline::new(before.path()).unwrap();
        let sql = rendered(&generate_patch(&context(after.path()), &baseline, None).unwrap());
        let refreshed = sql.iter().position(|s| s == &format!("DELETE FROM hardware_fts WHERE id = '{MINIMOOG_ID}';"));
        let refreshed = refreshed.expect("minimoog search row is refreshed");
        assert!(sql[refreshed + 1].contains("'Moog Music'"));
        assert!(!sql.iter().any(|s| s.starts_with("INSERT INTO hardware ")));
    }

    #[test]
    fn test_file_name() {
        let patch = Patch {
            created_at: time::macros::datetime!(2024-03-09 07:05:01 UTC),
            statements: Vec::new(),
            skipped: Vec::new(),
            dataset_version: None,
        };
        assert_eq!(patch.file_name().unwrap(), "patch-20240309T070501Z.sql");
        assert!(patch.is_empty());
    }

    #[test]
    fn test_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let patch = Patch {
            created_at: time::macros::datetime!(2024-03-09 07:05:01 UTC),
            statements: Vec::new(),
            skipped: Vec::new(),
            dataset_version: None,
        };
        let path = patch.write_to(dir.path().join("patches")).unwrap();
        assert_eq!(path, dir.path().join("patches/patch-20240309T070501Z.sql"));
        let text = fs::read_to_string(path).unwrap();
        assert!(text.starts_with("BEGIN TRANSACTION;\nINSERT INTO metadata (key, value) VALUES ('built_at', "));
    }
}
