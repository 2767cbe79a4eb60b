//! Identifier lifecycle: assignment, immutability, duplicates and the one-time
//! legacy migration.

use crate::baseline::{Baseline, ChangeKind};
use crate::dataset::{Dataset, RecordFile};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use gearbase_records::Collection;
use gearbase_records::Document;
use gearbase_records::error::ErrorKind as RecordErrorKind;
use gearbase_records::models::RecordId;
use regex::Regex;
use serde::Serialize;
use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::sync::LazyLock;
use tracing::instrument;
use uuid::{Builder, Uuid};

static ID_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^id:[^\r\n]*").unwrap());

/// Source of fresh record ids.
pub trait IdGenerator {
    fn generate(&mut self) -> String;
}

/// Random UUID v4 tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;
impl IdGenerator for UuidGenerator {
    fn generate(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic, well-formed UUID v4 tokens built from a counter.
///
/// Useful wherever reproducible output matters more than uniqueness across runs.
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    next: u128,
}
impl SequenceGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }
}
impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
impl IdGenerator for SequenceGenerator {
    fn generate(&mut self) -> String {
        let id = Builder::from_random_bytes(self.next.to_be_bytes()).into_uuid();
        self.next += 1;
        id.to_string()
    }
}

/// An id written into a record that had none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub collection: Collection,
    pub slug: String,
    pub id: String,
}

/// A previously assigned id that changed or disappeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdViolation {
    pub collection: Collection,
    pub slug: String,
    pub old: String,
    /// `None` when the id was removed.
    pub new: Option<String>,
}
impl Display for IdViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.new {
            Some(new) => write!(f, "{}/{}: id changed from '{}' to '{new}'", self.collection, self.slug, self.old),
            None => write!(f, "{}/{}: id '{}' was removed", self.collection, self.slug, self.old),
        }
    }
}

/// One id carried by more than one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateId {
    pub id: String,
    pub records: Vec<(Collection, String)>,
}

/// Outcome of the legacy id migration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Migration {
    /// `collection → (legacy id → new id)`.
    pub mapping: BTreeMap<Collection, BTreeMap<String, String>>,
}
impl Migration {
    pub fn len(&self) -> usize {
        self.mapping.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads the `id` field of a record document.
///
/// A null or empty id counts as absent. An id of any other shape (a negative
/// or fractional number, a boolean, a collection) is an error rather than
/// absent, so callers never mistake it for a record that still needs one.
pub fn read_id(text: &str) -> gearbase_records::error::Result<Option<RecordId>> {
    let document = Document::parse(text)?;
    match document.value().get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => match serde_yaml::from_value(value.clone()) {
            Ok(id) => Ok(Some(id)),
            Err(_) => {
                let raw = serde_yaml::to_string(value).unwrap_or_default();
                exn::bail!(RecordErrorKind::InvalidId(raw.trim_end().to_string()))
            },
        },
    }
}

/// Writes `id: <id>` into a record document.
///
/// An existing top-level `id` line is replaced in place; otherwise the id
/// becomes the first line (after a leading `---` marker, if any). Every other
/// byte is preserved.
pub fn set_id(text: &str, id: &str) -> String {
    let line = format!("id: {id}");
    if let Some(found) = ID_LINE_REGEX.find(text) {
        return format!("{}{line}{}", &text[..found.start()], &text[found.end()..]);
    }
    match text.strip_prefix("---\n") {
        Some(rest) => format!("---\n{line}\n{rest}"),
        None => format!("{line}\n{text}"),
    }
}

/// Compares a record's id before and after a change.
pub fn check_pair(
    collection: Collection,
    slug: &str,
    old: Option<&RecordId>,
    new: Option<&RecordId>,
) -> Option<IdViolation> {
    let old = old?.to_string();
    let new = new.map(ToString::to_string);
    match new.as_deref() == Some(old.as_str()) {
        true => None,
        false => Some(IdViolation { collection, slug: slug.to_string(), old, new }),
    }
}

/// Gives every record without an id a fresh one, writing it back to the file.
///
/// Idempotent: once every record has an id, nothing is assigned.
#[instrument(skip_all, fields(root = %dataset.root().display()))]
pub fn assign_ids(dataset: &Dataset, generator: &mut dyn IdGenerator) -> Result<Vec<Assignment>> {
    let records = read_all(dataset)?;
    let mut used: HashSet<String> = records.iter().filter_map(|(_, _, id)| id.as_ref().map(ToString::to_string)).collect();
    let mut assignments = Vec::new();
    for (file, text, id) in records {
        if id.is_some() {
            continue;
        }
        let id = fresh_id(generator, &mut used);
        dataset.write(&file, &set_id(&text, &id))?;
        tracing::info!(collection = %file.collection, slug = %file.slug, %id, "Assigned record id");
        assignments.push(Assignment { collection: file.collection, slug: file.slug, id });
    }
    Ok(assignments)
}

/// Checks that no modified record lost or changed the id it had in the baseline.
#[instrument(skip_all, fields(root = %dataset.root().display()))]
pub fn check_immutability(dataset: &Dataset, baseline: &dyn Baseline) -> Result<Vec<IdViolation>> {
    let mut violations = Vec::new();
    for change in baseline.changes(dataset)? {
        if change.kind != ChangeKind::Modified {
            continue;
        }
        let Some(old_text) = baseline.read(change.collection, &change.slug)? else {
            continue;
        };
        let Ok(Some(old)) = read_id(&old_text) else {
            continue;
        };
        let Some(file) = dataset.find(change.collection, &change.slug) else {
            continue;
        };
        let violation = match read_id(&dataset.read(&file)?) {
            Ok(new) => check_pair(change.collection, &change.slug, Some(&old), new.as_ref()),
            Err(e) => match &*e {
                // A malformed id replaced a valid one.
                RecordErrorKind::InvalidId(raw) => Some(IdViolation {
                    collection: change.collection,
                    slug: change.slug.clone(),
                    old: old.to_string(),
                    new: Some(raw.clone()),
                }),
                _ => {
                    tracing::warn!(collection = %file.collection, slug = %file.slug, error = %*e, "Skipping unparsable record");
                    continue;
                },
            },
        };
        if let Some(violation) = violation {
            tracing::warn!(%violation, "Record id changed");
            violations.push(violation);
        }
    }
    Ok(violations)
}

/// Finds ids carried by more than one record. Unparsable records are skipped.
pub fn find_duplicate_ids(dataset: &Dataset) -> Result<Vec<DuplicateId>> {
    let mut owners: BTreeMap<String, Vec<(Collection, String)>> = BTreeMap::new();
    for file in dataset.all_record_files()? {
        let Ok(Some(id)) = read_id(&dataset.read(&file)?) else {
            continue;
        };
        owners.entry(id.to_string()).or_default().push((file.collection, file.slug));
    }
    Ok(owners
        .into_iter()
        .filter(|(_, records)| records.len() > 1)
        .map(|(id, records)| DuplicateId { id, records })
        .collect())
}

/// Replaces every legacy numeric id with a fresh token and records the mapping.
///
/// Runs once: it refuses to run when the mapping file already exists, or when
/// there is nothing to migrate.
#[instrument(skip_all, fields(root = %dataset.root().display()))]
pub fn migrate_legacy_ids(dataset: &Dataset, generator: &mut dyn IdGenerator) -> Result<Migration> {
    let mapping_path = dataset.migration_path();
    if mapping_path.exists() {
        exn::bail!(ErrorKind::MigrationAlreadyApplied(mapping_path));
    }
    let records = read_all(dataset)?;
    let mut used: HashSet<String> = records.iter().filter_map(|(_, _, id)| id.as_ref().map(ToString::to_string)).collect();
    let legacy: Vec<_> = records.into_iter().filter(|(_, _, id)| id.as_ref().is_some_and(RecordId::is_legacy)).collect();
    if legacy.is_empty() {
        exn::bail!(ErrorKind::NothingToMigrate);
    }

    let mut migration = Migration::default();
    for (file, text, old) in legacy {
        let Some(old) = old else { continue };
        let new = fresh_id(generator, &mut used);
        dataset.write(&file, &set_id(&text, &new))?;
        let previous = migration.mapping.entry(file.collection).or_default().insert(old.to_string(), new);
        if previous.is_some() {
            tracing::warn!(collection = %file.collection, slug = %file.slug, %old, "Legacy id used more than once");
        }
    }

    let mut json = serde_json::to_string_pretty(&migration).or_raise(|| ErrorKind::Io(mapping_path.clone()))?;
    json.push('\n');
    fs::write(&mapping_path, json).or_raise(|| ErrorKind::Io(mapping_path.clone()))?;
    tracing::info!(migrated = migration.len(), path = %mapping_path.display(), "Migrated legacy ids");
    Ok(migration)
}

fn read_all(dataset: &Dataset) -> Result<Vec<(RecordFile, String, Option<RecordId>)>> {
    let mut records = Vec::new();
    for file in dataset.all_record_files()? {
        let text = dataset.read(&file)?;
        let id = read_id(&text).or_raise(|| ErrorKind::MalformedRecord(file.path.clone()))?;
        records.push((file, text, id));
    }
    Ok(records)
}

fn fresh_id(generator: &mut dyn IdGenerator, used: &mut HashSet<String>) -> String {
    loop {
        let id = generator.generate();
        if used.insert(id.clone()) {
            return id;
        }
        tracing::debug!(%id, "Generated id already in use; regenerating");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::DirectoryBaseline;
    use gearbase_records::models::is_token;
    use rstest::rstest;
    use std::path::Path;

    const TOKEN: &str = "0b7e1c3a-5f2d-4e8a-9c61-3d2f1a4b5c6d";

    fn write(root: &Path, file: &str, contents: &str) {
        let path = root.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[rstest]
    #[case("name: Serum\n", "id: X\nname: Serum\n")]
    #[case("---\nname: Serum\n", "---\nid: X\nname: Serum\n")]
    #[case("name: Serum\nid: 12\n", "name: Serum\nid: X\n")]
    #[case("id:\nname: Serum\n", "id: X\nname: Serum\n")]
    #[case("id: 12\r\nname: Serum\r\n", "id: X\r\nname: Serum\r\n")]
    #[case("name: Serum\nversions:\n  - id: 3\n", "id: X\nname: Serum\nversions:\n  - id: 3\n")]
    fn test_set_id(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(set_id(input, "X"), expected);
    }

    #[rstest]
    #[case("name: Serum\n", None)]
    #[case("id: ~\nname: Serum\n", None)]
    #[case("id: ''\nname: Serum\n", None)]
    #[case("id: 12\n", Some(RecordId::Legacy(12)))]
    #[case("id: 0b7e1c3a-5f2d-4e8a-9c61-3d2f1a4b5c6d\n", Some(RecordId::from(TOKEN)))]
    fn test_read_id(#[case] text: &str, #[case] expected: Option<RecordId>) {
        assert_eq!(read_id(text).unwrap(), expected);
    }

    #[rstest]
    #[case("id: -42\n", "-42")]
    #[case("id: 1.5\n", "1.5")]
    #[case("id: true\n", "true")]
    fn test_read_id_rejects_malformed(#[case] text: &str, #[case] raw: &str) {
        let err = read_id(text).unwrap_err();
        assert_eq!(*err, RecordErrorKind::InvalidId(raw.into()));
    }

    #[test]
    fn test_assign_ids_keeps_malformed_id() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "manufacturers/moog.yaml", "id: -42\nname: Moog\n");
        write(dir.path(), "manufacturers/korg.yaml", "name: Korg\n");
        let dataset = Dataset::open(dir.path()).unwrap();

        let err = assign_ids(&dataset, &mut SequenceGenerator::new()).unwrap_err();
        assert_eq!(*err, ErrorKind::MalformedRecord(dir.path().join("manufacturers/moog.yaml")));
        assert_eq!(fs::read_to_string(dir.path().join("manufacturers/moog.yaml")).unwrap(), "id: -42\nname: Moog\n");
        assert_eq!(fs::read_to_string(dir.path().join("manufacturers/korg.yaml")).unwrap(), "name: Korg\n");
    }

    #[test]
    fn test_immutability_flags_malformed_replacement() {
        let snapshot = tempfile::tempdir().unwrap();
        let current = tempfile::tempdir().unwrap();
        write(snapshot.path(), "software/serum.yaml", &format!("id: {TOKEN}\nname: Serum\n"));
        write(current.path(), "software/serum.yaml", "id: 1.5\nname: Serum\n");
        let dataset = Dataset::open(current.path()).unwrap();
        let baseline = DirectoryBaseline::new(snapshot.path()).unwrap();

        assert_eq!(
            check_immutability(&dataset, &baseline).unwrap(),
            [IdViolation {
                collection: Collection::Software,
                slug: "serum".into(),
                old: TOKEN.into(),
                new: Some("1.5".into()),
            }]
        );
    }

    #[test]
    fn test_sequence_generator_is_valid_and_deterministic() {
        let mut a = SequenceGenerator::new();
        let mut b = SequenceGenerator::new();
        let first = a.generate();
        assert!(is_token(&first), "{first}");
        assert_eq!(first, b.generate());
        assert_ne!(first, a.generate());
        assert!(is_token(&UuidGenerator.generate()));
    }

    #[rstest]
    #[case(None, None, false)]
    #[case(None, Some(TOKEN), false)]
    #[case(Some(TOKEN), Some(TOKEN), false)]
    #[case(Some(TOKEN), None, true)]
    #[case(Some(TOKEN), Some("1f2e3d4c-5b6a-4978-8695-a4b3c2d1e0f9"), true)]
    fn test_check_pair(#[case] old: Option<&str>, #[case] new: Option<&str>, #[case] violated: bool) {
        let old = old.map(RecordId::from);
        let new = new.map(RecordId::from);
        let violation = check_pair(Collection::Software, "serum", old.as_ref(), new.as_ref());
        assert_eq!(violation.is_some(), violated);
    }

    #[test]
    fn test_assign_ids_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "software/serum.yaml", "name: Serum\nmanufacturer: xfer-records\n");
        write(dir.path(), "manufacturers/xfer-records.yaml", &format!("id: {TOKEN}\nname: Xfer Records\n"));
        let dataset = Dataset::open(dir.path()).unwrap();
        let mut generator = SequenceGenerator::new();

        let assigned = assign_ids(&dataset, &mut generator).unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].slug, "serum");
        let text = fs::read_to_string(dir.path().join("software/serum.yaml")).unwrap();
        assert_eq!(text, format!("id: {}\nname: Serum\nmanufacturer: xfer-records\n", assigned[0].id));

        assert!(assign_ids(&dataset, &mut generator).unwrap().is_empty());
    }

    #[test]
    fn test_assign_ids_skips_ids_in_use() {
        let dir = tempfile::tempdir().unwrap();
        let taken = SequenceGenerator::new().generate();
        write(dir.path(), "manufacturers/moog.yaml", &format!("id: {taken}\nname: Moog\n"));
        write(dir.path(), "manufacturers/korg.yaml", "name: Korg\n");
        let dataset = Dataset::open(dir.path()).unwrap();
        let assigned = assign_ids(&dataset, &mut SequenceGenerator::new()).unwrap();
        assert_eq!(assigned.len(), 1);
        assert_ne!(assigned[0].id, taken);
    }

    #[test]
    fn test_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "software/serum.yaml", &format!("id: {TOKEN}\nname: Serum\n"));
        write(dir.path(), "hardware/op-1.yaml", &format!("id: {TOKEN}\nname: OP-1\n"));
        write(dir.path(), "hardware/op-z.yaml", "name: OP-Z\n");
        let dataset = Dataset::open(dir.path()).unwrap();
        let duplicates = find_duplicate_ids(&dataset).unwrap();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(
            duplicates[0].records,
            [(Collection::Software, "serum".to_string()), (Collection::Hardware, "op-1".to_string())]
        );
    }

    #[test]
    fn test_immutability_against_snapshot() {
        let snapshot = tempfile::tempdir().unwrap();
        let current = tempfile::tempdir().unwrap();
        let other = "1f2e3d4c-5b6a-4978-8695-a4b3c2d1e0f9";
        write(snapshot.path(), "software/serum.yaml", &format!("id: {TOKEN}\nname: Serum\n"));
        write(snapshot.path(), "software/vital.yaml", &format!("id: {other}\nname: Vital\n"));
        write(snapshot.path(), "software/massive.yaml", "name: Massive\n");
        write(current.path(), "software/serum.yaml", &format!("id: {other}\nname: Serum 2\n"));
        write(current.path(), "software/vital.yaml", "name: Vital 2\n");
        write(current.path(), "software/massive.yaml", &format!("id: {TOKEN}\nname: Massive\n"));
        let dataset = Dataset::open(current.path()).unwrap();
        let baseline = DirectoryBaseline::new(snapshot.path()).unwrap();

        let violations = check_immutability(&dataset, &baseline).unwrap();
        assert_eq!(
            violations,
            [
                IdViolation {
                    collection: Collection::Software,
                    slug: "serum".into(),
                    old: TOKEN.into(),
                    new: Some(other.into()),
                },
                IdViolation { collection: Collection::Software, slug: "vital".into(), old: other.into(), new: None },
            ]
        );
    }

    #[test]
    fn test_migrate_legacy_ids() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "manufacturers/moog.yaml", "id: 1\nname: Moog\n");
        write(dir.path(), "hardware/minimoog.yaml", "id: 1\nname: Minimoog\nmanufacturer: moog\n");
        write(dir.path(), "software/serum.yaml", &format!("id: {TOKEN}\nname: Serum\n"));
        let dataset = Dataset::open(dir.path()).unwrap();

        let migration = migrate_legacy_ids(&dataset, &mut SequenceGenerator::new()).unwrap();
        assert_eq!(migration.len(), 2);
        let new = &migration.mapping[&Collection::Hardware]["1"];
        let text = fs::read_to_string(dir.path().join("hardware/minimoog.yaml")).unwrap();
        assert!(text.starts_with(&format!("id: {new}\n")));
        let serum = fs::read_to_string(dir.path().join("software/serum.yaml")).unwrap();
        assert!(serum.contains(TOKEN));

        let mapping: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dataset.migration_path()).unwrap()).unwrap();
        assert_eq!(mapping["manufacturers"]["1"], migration.mapping[&Collection::Manufacturers]["1"].as_str());

        let err = migrate_legacy_ids(&dataset, &mut SequenceGenerator::new()).unwrap_err();
        assert_eq!(*err, ErrorKind::MigrationAlreadyApplied(dataset.migration_path()));
    }

    #[test]
    fn test_migrate_without_legacy_ids() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "software/serum.yaml", &format!("id: {TOKEN}\nname: Serum\n"));
        let dataset = Dataset::open(dir.path()).unwrap();
        let err = migrate_legacy_ids(&dataset, &mut SequenceGenerator::new()).unwrap_err();
        assert_eq!(*err, ErrorKind::NothingToMigrate);
        assert!(!dataset.migration_path().exists());
    }
}
