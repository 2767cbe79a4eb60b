//! Well-formedness of free-text markup fields.
//!
//! Only two things are checked: fenced code blocks open and close in pairs,
//! and outside fences every inline code span on a line is closed on that line.

use crate::codes::ErrorCode;
use crate::issue::{Findings, Issue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Problem {
    /// Fence opened on this (0-based) line of the value is never closed.
    UnclosedFence(usize),
    /// Inline code span left open on this (0-based) line.
    UnbalancedInlineCode(usize),
}

struct Fence {
    marker: char,
    length: usize,
    line: usize,
}

/// Returns the fence marker and its run length if `line` is a fence line.
fn fence(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let length = trimmed.chars().take_while(|c| *c == marker).count();
    (length >= 3).then_some((marker, length))
}

/// Whether every backtick run on the line is matched by a later run of the same length.
fn inline_balanced(line: &str) -> bool {
    let mut open: Option<usize> = None;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '`' {
            continue;
        }
        let mut run = 1;
        while chars.next_if_eq(&'`').is_some() {
            run += 1;
        }
        open = match open {
            None => Some(run),
            Some(length) if length == run => None,
            // A shorter or longer run inside a span is literal content.
            keep => keep,
        };
    }
    open.is_none()
}

pub(crate) fn problems(text: &str) -> Vec<Problem> {
    let mut problems = Vec::new();
    let mut open: Option<Fence> = None;
    for (number, line) in text.lines().enumerate() {
        if let Some((marker, length)) = fence(line) {
            match &open {
                None => open = Some(Fence { marker, length, line: number }),
                Some(current) => {
                    let rest = line.trim_start_matches(' ')[length..].trim();
                    if marker == current.marker && length >= current.length && rest.is_empty() {
                        open = None;
                    }
                },
            }
            continue;
        }
        if open.is_none() && !inline_balanced(line) {
            problems.push(Problem::UnbalancedInlineCode(number));
        }
    }
    if let Some(fence) = open {
        problems.push(Problem::UnclosedFence(fence.line));
    }
    problems
}

/// Checks the markup text at `path`, reporting each problem on its source line.
pub(crate) fn check(text: &str, path: &str, findings: &mut Findings<'_>) {
    for problem in problems(text) {
        let (issue, offset) = match problem {
            Problem::UnclosedFence(line) => {
                (Issue::new(ErrorCode::UnclosedFence, path, "code fence is never closed"), line)
            },
            Problem::UnbalancedInlineCode(line) => {
                (Issue::new(ErrorCode::UnbalancedInlineCode, path, "inline code span is not closed on this line"), line)
            },
        };
        findings.push_text_line(issue, offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gearbase_records::SourceMap;
    use rstest::rstest;

    #[rstest]
    #[case("Plain text.")]
    #[case("Use `code` and ``more `code` here``.")]
    #[case("```\nlet x = `;\n```")]
    #[case("~~~rust\nfn main() {}\n~~~")]
    #[case("````\n```\nnested\n```\n````")]
    #[case("")]
    fn test_well_formed(#[case] text: &str) {
        assert_eq!(problems(text), []);
    }

    #[rstest]
    #[case("Intro\n```\ncode", vec![Problem::UnclosedFence(1)])]
    #[case("```\ncode\n~~~", vec![Problem::UnclosedFence(0)])]
    #[case("```\ncode\n```rust", vec![Problem::UnclosedFence(0)])]
    #[case("one `open\ntwo `closed`", vec![Problem::UnbalancedInlineCode(0)])]
    #[case("``a` b", vec![Problem::UnbalancedInlineCode(0)])]
    #[case("`a\n```\n`b\n", vec![Problem::UnbalancedInlineCode(0), Problem::UnclosedFence(1)])]
    fn test_problems(#[case] text: &str, #[case] expected: Vec<Problem>) {
        assert_eq!(problems(text), expected);
    }

    #[test]
    fn test_issues_point_into_block_scalar() {
        let yaml = "name: x\ndescription: |\n  Intro `ok`\n\n  ```\n  never closed\n";
        let source = SourceMap::parse(yaml);
        let mut findings = Findings::new(Some(&source));
        check("Intro `ok`\n\n```\nnever closed\n", "description", &mut findings);
        let issues = findings.into_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ErrorCode::UnclosedFence);
        assert_eq!(issues[0].line, Some(5));
    }
}
