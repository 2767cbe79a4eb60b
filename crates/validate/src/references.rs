//! Cross-record references and category duplication.

use crate::codes::ErrorCode;
use crate::issue::{Findings, Issue};
use gearbase_catalog::SlugIndex;
use gearbase_records::{Collection, slug};
use gearbase_schema::Registry;
use gearbase_schema::suggest::nearest;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Checks that a product's `manufacturer` names an existing manufacturer record.
pub(crate) fn check_manufacturer(
    collection: Collection,
    record: &Mapping,
    slugs: &SlugIndex,
    findings: &mut Findings<'_>,
) {
    if !collection.has_manufacturer() {
        return;
    }
    // Malformed slugs are already reported structurally.
    let Some(manufacturer) = record.get("manufacturer").and_then(Value::as_str) else {
        return;
    };
    if !slug::is_valid_slug_format(manufacturer) {
        return;
    }
    let message = match slugs.lookup(manufacturer) {
        Some(Collection::Manufacturers) => return,
        Some(other) => format!("`{manufacturer}` is a {} record, not a manufacturer", other.as_str()),
        None => format!("no manufacturer with slug `{manufacturer}`"),
    };
    let suggestion = nearest(manufacturer, slugs.slugs_in(Collection::Manufacturers));
    findings.push(Issue::new(ErrorCode::UnknownManufacturer, "manufacturer", message).with_suggestion(suggestion));
}

/// Checks that no category appears twice once aliases are normalized.
///
/// Covers repeats within `categories`, primary or secondary categories that
/// are also listed in `categories`, and a secondary category equal to the
/// primary one.
pub(crate) fn check_categories(record: &Mapping, registry: &Registry, findings: &mut Findings<'_>) {
    let mut listed: BTreeMap<&str, usize> = BTreeMap::new();
    if let Some(items) = record.get("categories").and_then(Value::as_sequence) {
        for (i, item) in items.iter().enumerate() {
            let Some(value) = item.as_str() else {
                continue;
            };
            let canonical = registry.normalize_category(value);
            match listed.get(canonical) {
                Some(first) => findings.push(Issue::new(
                    ErrorCode::DuplicateCategory,
                    format!("categories.{i}"),
                    format!("category `{canonical}` is already listed at categories.{first}"),
                )),
                None => {
                    listed.insert(canonical, i);
                },
            }
        }
    }

    let primary = record.get("primaryCategory").and_then(Value::as_str).map(|v| registry.normalize_category(v));
    let secondary = record.get("secondaryCategory").and_then(Value::as_str).map(|v| registry.normalize_category(v));
    for (field, value) in [("primaryCategory", primary), ("secondaryCategory", secondary)] {
        if let Some(value) = value
            && let Some(i) = listed.get(value)
        {
            findings.push(Issue::new(
                ErrorCode::DuplicateCategory,
                field,
                format!("category `{value}` is also listed at categories.{i}"),
            ));
        }
    }
    if let (Some(primary), Some(secondary)) = (primary, secondary)
        && primary == secondary
    {
        findings.push(Issue::new(
            ErrorCode::DuplicateCategory,
            "secondaryCategory",
            format!("secondary category `{secondary}` is the same as the primary category"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearbase_records::Document;
    use gearbase_schema::Vocabulary;

    fn registry() -> Registry {
        Registry::new(Vocabulary {
            categories: vec!["synth".into(), "effect".into(), "sampler".into()],
            aliases: [("synthesizer".to_string(), "synth".to_string())].into(),
            ..Vocabulary::default()
        })
        .unwrap()
    }

    fn slugs() -> SlugIndex {
        let mut slugs = SlugIndex::default();
        slugs.claim("moog", Collection::Manufacturers).unwrap();
        slugs.claim("xfer-records", Collection::Manufacturers).unwrap();
        slugs.claim("serum", Collection::Software).unwrap();
        slugs
    }

    fn run(collection: Collection, yaml: &str) -> Vec<Issue> {
        let document = Document::parse(yaml).unwrap();
        let record = document.value().as_mapping().unwrap();
        let mut findings = Findings::new(Some(document.source()));
        check_manufacturer(collection, record, &slugs(), &mut findings);
        check_categories(record, &registry(), &mut findings);
        findings.into_issues()
    }

    #[test]
    fn test_known_manufacturer() {
        assert_eq!(run(Collection::Software, "manufacturer: xfer-records\n"), []);
        assert_eq!(run(Collection::Hardware, "manufacturer: moog\n"), []);
    }

    #[test]
    fn test_unknown_manufacturer_suggests_nearest() {
        let found = run(Collection::Software, "name: Serum\nmanufacturer: xfer-record\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, ErrorCode::UnknownManufacturer);
        assert_eq!(found[0].suggestion.as_deref(), Some("xfer-records"));
        assert_eq!(found[0].line, Some(2));
    }

    #[test]
    fn test_manufacturer_in_wrong_collection() {
        let found = run(Collection::Hardware, "manufacturer: serum\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message, "`serum` is a software record, not a manufacturer");
        assert_eq!(found[0].suggestion, None);
    }

    #[test]
    fn test_manufacturer_records_have_no_reference() {
        assert_eq!(run(Collection::Manufacturers, "name: Moog\n"), []);
    }

    #[test]
    fn test_duplicate_categories_after_normalization() {
        let yaml = "\
categories:
  - synth
  - effect
  - synthesizer
primaryCategory: synthesizer
secondaryCategory: sampler
";
        let found = run(Collection::Software, yaml);
        let paths: Vec<_> = found.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, ["categories.2", "primaryCategory"]);
        assert!(found.iter().all(|i| i.code == ErrorCode::DuplicateCategory));
        assert_eq!(found[0].message, "category `synth` is already listed at categories.0");
        assert_eq!(found[0].line, Some(4));
    }

    #[test]
    fn test_primary_equals_secondary() {
        let found = run(Collection::Software, "primaryCategory: synth\nsecondaryCategory: synthesizer\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "secondaryCategory");
        assert_eq!(found[0].line, Some(2));
    }
}
