//! Controlled-vocabulary checks against the schema registry.

use crate::codes::ErrorCode;
use crate::issue::{Findings, Issue};
use gearbase_records::Collection;
use gearbase_schema::Registry;
use gearbase_schema::suggest::{OPTION_DISPLAY_LIMIT, nearest, truncate_options};
use serde_yaml::{Mapping, Value};

struct Terms<'a> {
    code: ErrorCode,
    noun: &'static str,
    accepts: &'a dyn Fn(&str) -> bool,
    options: Vec<&'a str>,
}
impl Terms<'_> {
    fn check(&self, value: &str, path: String, findings: &mut Findings<'_>) {
        if (self.accepts)(value) {
            return;
        }
        let options = truncate_options(self.options.iter().copied(), OPTION_DISPLAY_LIMIT);
        let message = format!("unknown {} `{value}`, expected one of {options}", self.noun);
        findings.push(Issue::new(self.code, path, message).with_suggestion(nearest(value, self.options.iter().copied())));
    }

    fn check_list(&self, record: &Mapping, field: &str, findings: &mut Findings<'_>) {
        let Some(items) = record.get(field).and_then(Value::as_sequence) else {
            return;
        };
        for (i, item) in items.iter().enumerate() {
            if let Some(value) = item.as_str() {
                self.check(value, format!("{field}.{i}"), findings);
            }
        }
    }

    fn check_keys(&self, record: &Mapping, field: &str, findings: &mut Findings<'_>) {
        let Some(map) = record.get(field).and_then(Value::as_mapping) else {
            return;
        };
        for key in map.keys().filter_map(Value::as_str) {
            self.check(key, format!("{field}.{key}"), findings);
        }
    }
}

/// Checks categories, formats, platforms and translation locales.
pub(crate) fn check(collection: Collection, record: &Mapping, registry: &Registry, findings: &mut Findings<'_>) {
    let locales = Terms {
        code: ErrorCode::Locale,
        noun: "locale",
        accepts: &|value| registry.is_valid_locale(value),
        options: registry.locales().collect(),
    };
    locales.check_keys(record, "translations", findings);
    if collection == Collection::Manufacturers {
        return;
    }

    let categories = Terms {
        code: ErrorCode::Category,
        noun: "category",
        accepts: &|value| registry.is_valid_category(value),
        options: registry.categories().collect(),
    };
    categories.check_list(record, "categories", findings);
    for field in ["primaryCategory", "secondaryCategory"] {
        if let Some(value) = record.get(field).and_then(Value::as_str) {
            categories.check(value, field.to_string(), findings);
        }
    }
    if collection != Collection::Software {
        return;
    }

    let formats = Terms {
        code: ErrorCode::Format,
        noun: "format",
        accepts: &|value| registry.is_valid_format(value),
        options: registry.formats().collect(),
    };
    formats.check_list(record, "formats", findings);
    formats.check_keys(record, "identifiers", findings);

    let platforms = Terms {
        code: ErrorCode::Platform,
        noun: "platform",
        accepts: &|value| registry.is_valid_platform(value),
        options: registry.platforms().collect(),
    };
    platforms.check_list(record, "platforms", findings);
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearbase_records::Document;
    use gearbase_schema::{Locale, Vocabulary};

    fn registry() -> Registry {
        Registry::new(Vocabulary {
            categories: vec!["synth".into(), "effect".into(), "sampler".into(), "daw".into()],
            aliases: [("synthesizer".to_string(), "synth".to_string())].into(),
            formats: vec!["vst3".into(), "au".into(), "aax".into(), "clap".into()],
            platforms: vec!["windows".into(), "macos".into(), "linux".into()],
            locales: vec![Locale { code: "de".into(), name: "German".into(), native: "Deutsch".into() }],
        })
        .unwrap()
    }

    fn issues(collection: Collection, yaml: &str) -> Vec<Issue> {
        let document = Document::parse(yaml).unwrap();
        let mut findings = Findings::new(Some(document.source()));
        check(collection, document.value().as_mapping().unwrap(), &registry(), &mut findings);
        findings.into_issues()
    }

    #[test]
    fn test_valid_values_and_aliases_pass() {
        let yaml = "\
categories: [synthesizer, effect]
primaryCategory: synth
formats: [vst3, clap]
identifiers:
  vst3: com.xfer.serum
platforms: [macos]
translations:
  de:
    name: Serum
";
        assert_eq!(issues(Collection::Software, yaml), []);
    }

    #[test]
    fn test_unknown_values() {
        let yaml = "\
categories:
  - synth
  - efect
secondaryCategory: drums
formats: [vts3]
identifiers:
  vst: com.xfer.serum
platforms: [solaris]
translations:
  fr: {}
";
        let found = issues(Collection::Software, yaml);
        let summary: Vec<_> = found.iter().map(|i| (i.code, i.path.as_str(), i.suggestion.as_deref())).collect();
        assert_eq!(
            summary,
            [
                (ErrorCode::Locale, "translations.fr", Some("de")),
                (ErrorCode::Category, "categories.1", Some("effect")),
                (ErrorCode::Category, "secondaryCategory", None),
                (ErrorCode::Format, "formats.0", Some("vst3")),
                (ErrorCode::Format, "identifiers.vst", Some("vst3")),
                (ErrorCode::Platform, "platforms.0", None),
            ]
        );
        assert_eq!(found[1].message, "unknown category `efect`, expected one of `daw`, `effect`, `sampler`, `synth`");
        assert_eq!((found[1].line, found[1].column), (Some(3), Some(3)));
        assert_eq!((found[3].line, found[3].column), (Some(5), Some(11)));
    }

    #[test]
    fn test_manufacturers_only_check_locales() {
        let found = issues(Collection::Manufacturers, "name: Moog\ntranslations:\n  xx:\n    name: Moog\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, ErrorCode::Locale);
    }

    #[test]
    fn test_hardware_skips_software_vocabularies() {
        let found = issues(Collection::Hardware, "categories: [synth]\nformats: [nope]\n");
        assert_eq!(found, []);
    }
}
