use crate::codes::ErrorCode;
use gearbase_records::SourceMap;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub code: ErrorCode,
    /// Dotted field path (`versions.0.prices.1.currency`); empty for the whole record.
    pub path: String,
    pub message: String,
    /// Nearest valid value, when one is close enough to be worth offering.
    pub suggestion: Option<String>,
    /// 1-indexed source line.
    pub line: Option<usize>,
    /// 1-indexed source column.
    pub column: Option<usize>,
}
impl Issue {
    pub fn new(code: ErrorCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code, path: path.into(), message: message.into(), suggestion: None, line: None, column: None }
    }

    pub fn with_suggestion(mut self, suggestion: Option<impl Into<String>>) -> Self {
        self.suggestion = suggestion.map(Into::into);
        self
    }

    pub fn at(mut self, line: Option<usize>, column: Option<usize>) -> Self {
        self.line = line;
        self.column = column;
        self
    }
}
impl Display for Issue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}] ", self.code)?;
        if !self.path.is_empty() {
            write!(f, "{}: ", self.path)?;
        }
        write!(f, "{}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " (did you mean `{suggestion}`?)")?;
        }
        Ok(())
    }
}

/// Collects the issues of one record, resolving source positions as they are added.
pub(crate) struct Findings<'a> {
    source: Option<&'a SourceMap>,
    issues: Vec<Issue>,
}
impl<'a> Findings<'a> {
    pub(crate) fn new(source: Option<&'a SourceMap>) -> Self {
        Self { source, issues: Vec::new() }
    }

    /// Adds an issue positioned at `path` (or its nearest existing ancestor).
    pub(crate) fn push(&mut self, issue: Issue) {
        let issue = match (issue.line, self.source) {
            (None, Some(source)) => {
                let position = source.locate(&issue.path);
                issue.at(Some(position.line), Some(position.column))
            },
            _ => issue,
        };
        self.issues.push(issue);
    }

    /// Adds an issue on the `offset`-th line of the text value at `path`.
    pub(crate) fn push_text_line(&mut self, issue: Issue, offset: usize) {
        let line = self.source.map(|source| source.text_line(&issue.path, offset));
        self.issues.push(issue.at(line, None));
    }

    pub(crate) fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let issue = Issue::new(ErrorCode::Format, "formats.0", "unknown format `vts3`").with_suggestion(Some("vst3"));
        assert_eq!(issue.to_string(), "[schema/format] formats.0: unknown format `vts3` (did you mean `vst3`?)");
        let issue = Issue::new(ErrorCode::MissingId, "", "record has no id");
        assert_eq!(issue.to_string(), "[identifier/missing] record has no id");
    }

    #[test]
    fn test_findings_resolve_positions() {
        let source = SourceMap::parse("name: Serum\nformats:\n  - vts3\n");
        let mut findings = Findings::new(Some(&source));
        findings.push(Issue::new(ErrorCode::Format, "formats.0", "unknown format"));
        findings.push(Issue::new(ErrorCode::Required, "manufacturer", "missing"));
        let issues = findings.into_issues();
        assert_eq!((issues[0].line, issues[0].column), (Some(3), Some(3)));
        assert_eq!((issues[1].line, issues[1].column), (Some(1), Some(1)));
    }
}
