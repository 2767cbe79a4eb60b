use gearbase_config::Config;
use gearbase_records::Collection;
use gearbase_validate::{Context, ErrorClass, ErrorCode, validate_dataset, validate_record};
use std::fs;
use std::path::Path;

fn write(root: &Path, file: &str, contents: &str) {
    let path = root.join(file);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "schema/categories.yaml", "categories: [synth, effect, daw]\naliases:\n  synthesizer: synth\n");
    write(root, "schema/formats.yaml", "formats: [vst3, au, clap]\n");
    write(root, "schema/platforms.yaml", "platforms: [windows, macos, linux]\n");
    write(root, "schema/locales.yaml", "locales:\n  - code: de\n    name: German\n    native: Deutsch\n");
    write(
        root,
        "data/manufacturers/xfer-records.yaml",
        "id: 2f1c9d8e-4b7a-4c3d-8e9f-0a1b2c3d4e5f\nname: Xfer Records\nwebsite: https://xferrecords.com/\n",
    );
    write(
        root,
        "data/software/serum.yaml",
        "\
id: 7d3e2b1a-9c8f-4e6d-a5b4-c3d2e1f0a9b8
name: Serum
manufacturer: xfer-records
description: |
  Wavetable synthesizer.

  ```
  unclosed
categories:
  - synthesizer
  - synth
formats: [vst3, aax]
versions:
  - name: '1.0'
    releaseDate: 2014
prices:
  - amount: 189
    currency: USD
links:
  - type: video
    url: https://www.youtube.com/watch?v=abc123
",
    );
    dir
}

fn config(root: &Path) -> Config {
    Config { dataset: root.join("data"), schema: root.join("schema"), ..Config::default() }
}

#[test]
fn test_dataset_report() {
    let dir = project();
    let ctx = Context::from_config(&config(dir.path())).unwrap();
    let report = validate_dataset(&ctx, None).unwrap();

    assert_eq!(report.records.len(), 2);
    assert!(report.record(Collection::Manufacturers, "xfer-records").unwrap().passed());
    assert!(!report.integrity_failed());

    let serum = report.record(Collection::Software, "serum").unwrap();
    let found: Vec<_> = serum.issues.iter().map(|i| (i.code, i.path.as_str(), i.line)).collect();
    assert_eq!(
        found,
        [
            (ErrorCode::UnclosedFence, "description", Some(7)),
            (ErrorCode::YearOnly, "versions.0.releaseDate", Some(15)),
            (ErrorCode::Format, "formats.1", Some(12)),
            (ErrorCode::DuplicateCategory, "categories.1", Some(11)),
        ]
    );

    let counts = report.count_by_class();
    assert_eq!(counts[&ErrorClass::Schema], 2);
    assert_eq!(counts[&ErrorClass::Content], 1);
    assert_eq!(counts[&ErrorClass::Reference], 1);

    let text = report.to_string();
    assert!(text.contains("software/serum.yaml:12:"), "{text}");
    assert!(text.ends_with("4 issues in 1 of 2 records"), "{text}");
}

#[test]
fn test_incoming_record_against_dataset() {
    let dir = project();
    let ctx = Context::from_config(&config(dir.path())).unwrap();
    let report = validate_record(
        &ctx,
        Collection::Software,
        "vital",
        "name: Vital\nmanufacturer: xfer-recods\nplatforms: [macos, linux]\ntranslations:\n  de:\n    name: Vital\n",
    );
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].code, ErrorCode::UnknownManufacturer);
    assert_eq!(report.issues[0].suggestion.as_deref(), Some("xfer-records"));
    assert_eq!(
        report.to_string(),
        "software/vital.yaml:2:1: [reference/unknown-manufacturer] manufacturer: \
         no manufacturer with slug `xfer-recods` (did you mean `xfer-records`?)\n"
    );
}
