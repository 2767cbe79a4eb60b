use crate::codes::{ErrorClass, ErrorCode};
use crate::issue::Issue;
use gearbase_records::Collection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// Validation outcome for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReport {
    pub collection: Collection,
    pub slug: String,
    /// Path shown in messages, relative to the dataset root.
    pub source: PathBuf,
    pub issues: Vec<Issue>,
}
impl RecordReport {
    pub fn new(collection: Collection, slug: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self { collection, slug: slug.into(), source: source.into(), issues: Vec::new() }
    }

    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has(&self, code: ErrorCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}
impl Display for RecordReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for issue in &self.issues {
            write!(f, "{}", self.source.display())?;
            if let Some(line) = issue.line {
                write!(f, ":{line}")?;
                if let Some(column) = issue.column {
                    write!(f, ":{column}")?;
                }
            }
            writeln!(f, ": {issue}")?;
        }
        Ok(())
    }
}

/// Validation outcome for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub records: Vec<RecordReport>,
}
impl Report {
    pub fn push(&mut self, record: RecordReport) {
        self.records.push(record);
    }

    /// `false` if any record has any issue.
    pub fn passed(&self) -> bool {
        self.records.iter().all(RecordReport::passed)
    }

    /// `true` if an id was duplicated or changed.
    pub fn integrity_failed(&self) -> bool {
        self.issues().any(|(_, issue)| issue.code.is_integrity())
    }

    pub fn issue_count(&self) -> usize {
        self.records.iter().map(|r| r.issues.len()).sum()
    }

    pub fn failed_records(&self) -> usize {
        self.records.iter().filter(|r| !r.passed()).count()
    }

    pub fn issues(&self) -> impl Iterator<Item = (&RecordReport, &Issue)> {
        self.records.iter().flat_map(|record| record.issues.iter().map(move |issue| (record, issue)))
    }

    pub fn record(&self, collection: Collection, slug: &str) -> Option<&RecordReport> {
        self.records.iter().find(|r| r.collection == collection && r.slug == slug)
    }

    pub(crate) fn record_mut(&mut self, collection: Collection, slug: &str) -> Option<&mut RecordReport> {
        self.records.iter_mut().find(|r| r.collection == collection && r.slug == slug)
    }

    pub fn count_by_class(&self) -> BTreeMap<ErrorClass, usize> {
        let mut counts = BTreeMap::new();
        for (_, issue) in self.issues() {
            *counts.entry(issue.code.class()).or_insert(0) += 1;
        }
        counts
    }
}
impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for record in &self.records {
            write!(f, "{record}")?;
        }
        match self.passed() {
            true => write!(f, "{} records passed", self.records.len()),
            false => write!(
                f,
                "{} issues in {} of {} records",
                self.issue_count(),
                self.failed_records(),
                self.records.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> Report {
        let mut serum = RecordReport::new(Collection::Software, "serum", "software/serum.yaml");
        serum.issues.push(
            Issue::new(ErrorCode::Format, "formats.0", "unknown format `vts3`")
                .with_suggestion(Some("vst3"))
                .at(Some(12), Some(11)),
        );
        serum.issues.push(Issue::new(ErrorCode::UnclosedFence, "description", "unclosed code fence").at(Some(7), None));
        let moog = RecordReport::new(Collection::Manufacturers, "moog", "manufacturers/moog.yaml");
        Report { records: vec![moog, serum] }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            report().to_string(),
            "software/serum.yaml:12:11: [schema/format] formats.0: unknown format `vts3` (did you mean `vst3`?)\n\
             software/serum.yaml:7: [content/unclosed-fence] description: unclosed code fence\n\
             2 issues in 1 of 2 records"
        );
    }

    #[test]
    fn test_outcome() {
        let mut report = report();
        assert!(!report.passed());
        assert!(!report.integrity_failed());
        assert_eq!(report.count_by_class()[&ErrorClass::Schema], 1);
        assert_eq!(report.count_by_class()[&ErrorClass::Content], 1);

        report
            .record_mut(Collection::Manufacturers, "moog")
            .unwrap()
            .issues
            .push(Issue::new(ErrorCode::ChangedId, "id", "id changed"));
        assert!(report.integrity_failed());
        assert!(report.record(Collection::Manufacturers, "moog").unwrap().has(ErrorCode::ChangedId));
    }

    #[test]
    fn test_empty_report_passes() {
        let report = Report::default();
        assert!(report.passed());
        assert_eq!(report.to_string(), "0 records passed");
    }
}
