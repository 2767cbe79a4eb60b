use crate::codes::ErrorCode;
use crate::context::Context;
use crate::error::{ErrorKind, Result};
use crate::issue::{Findings, Issue};
use crate::report::{RecordReport, Report};
use crate::{identifiers, references, structure, vocabulary};
use exn::ResultExt;
use gearbase_catalog::Baseline;
use gearbase_catalog::ids::{check_immutability, find_duplicate_ids};
use gearbase_records::Collection;
use gearbase_records::{Document, SourceMap};
use gearbase_records::error::ErrorKind as RecordErrorKind;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::instrument;

/// Validates one record's raw text.
///
/// Pure with respect to the dataset: the text need not exist on disk. The
/// record is checked against the context's vocabularies and slug index.
#[instrument(skip_all, fields(collection = %collection, slug = %slug))]
pub fn validate_record(ctx: &Context, collection: Collection, slug: &str, text: &str) -> RecordReport {
    let source = PathBuf::from(collection.as_str()).join(format!("{slug}.yaml"));
    check_record(ctx, collection, slug, source, text)
}

fn check_record(ctx: &Context, collection: Collection, slug: &str, source: PathBuf, text: &str) -> RecordReport {
    let mut report = RecordReport::new(collection, slug, source);
    let document = match Document::parse(text) {
        Ok(document) => document,
        Err(err) => {
            let issue = match &*err {
                RecordErrorKind::Syntax { message, line, column } => {
                    Issue::new(ErrorCode::YamlSyntax, "", message.clone()).at(*line, *column)
                },
                other => Issue::new(ErrorCode::YamlSyntax, "", other.to_string()),
            };
            let mut findings = Findings::new(None);
            identifiers::check_slug(slug, &mut findings);
            report.issues = findings.into_issues();
            report.issues.push(issue);
            tracing::debug!(error = %*err, "Record is not valid YAML");
            return report;
        },
    };

    let mut findings = Findings::new(Some(document.source()));
    identifiers::check_slug(slug, &mut findings);
    match document.value().as_mapping() {
        Some(record) => {
            structure::check(collection, record, &mut findings);
            vocabulary::check(collection, record, ctx.registry(), &mut findings);
            references::check_manufacturer(collection, record, ctx.slugs(), &mut findings);
            if collection.has_manufacturer() {
                references::check_categories(record, ctx.registry(), &mut findings);
            }
            identifiers::check_id(record, ctx.require_ids(), &mut findings);
        },
        None => findings.push(Issue::new(
            ErrorCode::NotAMapping,
            "",
            format!("a record must be a mapping, found {}", structure::describe(document.value())),
        )),
    }
    report.issues = findings.into_issues();
    if !report.passed() {
        tracing::debug!(issues = report.issues.len(), "Record failed validation");
    }
    report
}

/// Validates every record in the dataset, then the checks that span records:
/// slug collisions, duplicate ids and, given a baseline, changed ids.
#[instrument(skip_all, fields(root = %ctx.dataset().root().display()))]
pub fn validate_dataset(ctx: &Context, baseline: Option<&dyn Baseline>) -> Result<Report> {
    let dataset = ctx.dataset();
    let mut report = Report::default();
    let mut id_lines = BTreeMap::new();
    for file in dataset.all_record_files().or_raise(|| ErrorKind::Dataset)? {
        let text = dataset.read(&file).or_raise(|| ErrorKind::Dataset)?;
        let source = dataset.relative(&file).to_path_buf();
        report.push(check_record(ctx, file.collection, &file.slug, source, &text));
        if let Some(line) = SourceMap::parse(&text).line("id") {
            id_lines.insert((file.collection, file.slug), line);
        }
    }

    for conflict in ctx.slug_conflicts() {
        for path in &conflict.paths {
            let others: Vec<String> =
                conflict.paths.iter().filter(|p| *p != path).map(|p| p.display().to_string()).collect();
            if let Some(record) = report.records.iter_mut().find(|r| &r.source == path) {
                record.issues.push(Issue::new(
                    ErrorCode::SlugCollision,
                    "",
                    format!("slug `{}` is also used by {}", conflict.slug, others.join(", ")),
                ));
            }
        }
    }

    for duplicate in find_duplicate_ids(dataset).or_raise(|| ErrorKind::Dataset)? {
        for (collection, slug) in &duplicate.records {
            let others: Vec<String> = duplicate
                .records
                .iter()
                .filter(|(c, s)| (c, s) != (collection, slug))
                .map(|(c, s)| format!("{c}/{s}"))
                .collect();
            let issue = Issue::new(
                ErrorCode::DuplicateId,
                "id",
                format!("id `{}` is also used by {}", duplicate.id, others.join(", ")),
            );
            push_located(&mut report, &id_lines, *collection, slug, issue);
        }
    }

    if let Some(baseline) = baseline {
        for violation in check_immutability(dataset, baseline).or_raise(|| ErrorKind::Baseline)? {
            let message = match &violation.new {
                Some(new) => format!("id changed from `{}` to `{new}`", violation.old),
                None => format!("id `{}` was removed", violation.old),
            };
            let issue = Issue::new(ErrorCode::ChangedId, "id", message);
            push_located(&mut report, &id_lines, violation.collection, &violation.slug, issue);
        }
    }

    tracing::info!(
        records = report.records.len(),
        issues = report.issue_count(),
        integrity_failed = report.integrity_failed(),
        "Validated dataset"
    );
    Ok(report)
}

/// Attaches a dataset-level issue to its record, positioned at the record's `id` line.
fn push_located(
    report: &mut Report,
    id_lines: &BTreeMap<(Collection, String), usize>,
    collection: Collection,
    slug: &str,
    issue: Issue,
) {
    let line = id_lines.get(&(collection, slug.to_string())).copied().unwrap_or(1);
    if let Some(record) = report.record_mut(collection, slug) {
        record.issues.push(issue.at(Some(line), Some(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearbase_catalog::{Dataset, DirectoryBaseline, SlugIndex, SlugScan};
    use gearbase_schema::{Registry, Vocabulary};
    use std::fs;
    use std::path::Path;

    const MOOG_ID: &str = "0b7e1c3a-5f2d-4e8a-9c61-3d2f1a4b5c6d";

    fn write(root: &Path, file: &str, contents: &str) {
        let path = root.join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn registry() -> Registry {
        Registry::new(Vocabulary { categories: vec!["synth".into()], ..Vocabulary::default() }).unwrap()
    }

    fn context(root: &Path) -> Context {
        let dataset = Dataset::open(root).unwrap();
        let slugs = SlugIndex::scan(&dataset).unwrap();
        Context::new(registry(), dataset, slugs)
    }

    #[test]
    fn test_yaml_syntax_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate_record(&context(dir.path()), Collection::Software, "serum", "name: [unclosed\n");
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].code, ErrorCode::YamlSyntax);
        assert!(report.issues[0].line.is_some());
        assert_eq!(report.source, Path::new("software/serum.yaml"));
    }

    #[test]
    fn test_not_a_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let report = validate_record(&context(dir.path()), Collection::Manufacturers, "moog", "- Moog\n");
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].code, ErrorCode::NotAMapping);
        assert_eq!(report.issues[0].message, "a record must be a mapping, found a list");
    }

    #[test]
    fn test_all_checks_run_on_a_broken_record() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "manufacturers/moog.yaml", "name: Moog\n");
        let ctx = context(dir.path()).with_require_ids(true);
        let yaml = "\
name: Minimoog
manufacturer: mog
categories: [synth, synht]
colour: black
";
        let report = validate_record(&ctx, Collection::Hardware, "Minimoog", yaml);
        let codes: Vec<_> = report.issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            [
                ErrorCode::SlugFormat,
                ErrorCode::UnknownField,
                ErrorCode::Category,
                ErrorCode::UnknownManufacturer,
                ErrorCode::MissingId,
            ]
        );
        assert_eq!(report.issues[2].suggestion.as_deref(), Some("synth"));
        assert_eq!(report.issues[3].suggestion.as_deref(), Some("moog"));
    }

    #[test]
    fn test_validate_dataset() {
        let snapshot = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let moog = format!("id: {MOOG_ID}\nname: Moog\n");
        write(snapshot.path(), "manufacturers/moog.yaml", &moog);
        write(dir.path(), "manufacturers/moog.yaml", "id: 1b7e1c3a-5f2d-4e8a-9c61-3d2f1a4b5c6d\nname: Moog\n");
        write(dir.path(), "software/mother-32.yaml", &format!("id: {MOOG_ID}\nname: Mother-32\nmanufacturer: moog\n"));
        write(dir.path(), "hardware/mother-32.yaml", "name: Mother-32\nmanufacturer: moog\n");
        write(dir.path(), "hardware/grandmother.yaml", &format!("name: Grandmother\nmanufacturer: moog\nid: {MOOG_ID}\n"));

        let ctx = context(dir.path());
        let baseline = DirectoryBaseline::new(snapshot.path()).unwrap();
        let report = validate_dataset(&ctx, Some(&baseline)).unwrap();
        assert_eq!(report.records.len(), 4);
        assert!(!report.passed());
        assert!(report.integrity_failed());

        let software = report.record(Collection::Software, "mother-32").unwrap();
        assert!(software.has(ErrorCode::SlugCollision));
        assert!(software.has(ErrorCode::DuplicateId));
        assert!(report.record(Collection::Hardware, "mother-32").unwrap().has(ErrorCode::SlugCollision));

        let grandmother = report.record(Collection::Hardware, "grandmother").unwrap();
        let duplicate = grandmother.issues.iter().find(|i| i.code == ErrorCode::DuplicateId).unwrap();
        assert_eq!(duplicate.message, format!("id `{MOOG_ID}` is also used by software/mother-32"));
        assert_eq!(duplicate.line, Some(3));

        let changed = report.record(Collection::Manufacturers, "moog").unwrap();
        assert_eq!(changed.issues.len(), 1);
        assert_eq!(changed.issues[0].code, ErrorCode::ChangedId);
        assert_eq!(changed.issues[0].line, Some(1));
    }

    #[test]
    fn test_clean_dataset_passes() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "manufacturers/moog.yaml", &format!("id: {MOOG_ID}\nname: Moog\n"));
        write(dir.path(), "hardware/minimoog.yaml", "name: Minimoog\nmanufacturer: moog\ncategories: [synth]\n");
        let report = validate_dataset(&context(dir.path()), None).unwrap();
        assert!(report.passed(), "{report}");
        assert_eq!(report.to_string(), "2 records passed");
    }

    #[test]
    fn test_empty_scan_context() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(registry(), Dataset::open(dir.path()).unwrap(), SlugScan::default());
        let report = validate_record(&ctx, Collection::Software, "serum", "name: Serum\nmanufacturer: xfer\n");
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].code, ErrorCode::UnknownManufacturer);
    }
}
