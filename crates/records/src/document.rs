use crate::error::{ErrorKind, Result};
use crate::source::SourceMap;
use serde_yaml::Value;

/// A parsed YAML record document with the source positions of its nodes.
///
/// The value tree is untyped so that validation can inspect documents that do
/// not (yet) match their collection's schema.
#[derive(Debug, Clone)]
pub struct Document {
    value: Value,
    source: SourceMap,
}
impl Document {
    /// Parses YAML text.
    ///
    /// Syntax errors carry the parser's 1-indexed line and column when known.
    /// An empty document parses to a null value.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = match serde_yaml::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                let location = e.location();
                exn::bail!(ErrorKind::Syntax {
                    message: e.to_string(),
                    line: location.as_ref().map(|l| l.line()),
                    column: location.as_ref().map(|l| l.column()),
                })
            },
        };
        Ok(Self { value, source: SourceMap::parse(text) })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn source(&self) -> &SourceMap {
        &self.source
    }

    /// Top-level string field, if present and a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_positions() {
        let document = Document::parse("name: Serum\ncategories:\n  - synth\n").unwrap();
        assert_eq!(document.str_field("name"), Some("Serum"));
        assert_eq!(document.source().line("categories.0"), Some(3));
    }

    #[test]
    fn test_syntax_error_location() {
        let err = Document::parse("name: Serum\ncategories: [synth\n").unwrap_err();
        match &*err {
            ErrorKind::Syntax { line, .. } => assert!(line.is_some()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_document_is_null() {
        let document = Document::parse("").unwrap();
        assert!(document.value().is_null());
    }
}
