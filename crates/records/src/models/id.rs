use crate::consts::{LEGACY_ID_REGEX, TOKEN_ID_REGEX};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Identifier stored in a record's `id` field.
///
/// Current records carry an opaque UUID token. Older datasets used small
/// sequential integers per collection; those are still readable so that they
/// can be flagged and migrated, but they are never generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Legacy(u64),
    Token(String),
}
impl RecordId {
    /// Returns `true` for the numeric scheme (including numbers written as strings).
    pub fn is_legacy(&self) -> bool {
        match self {
            RecordId::Legacy(_) => true,
            RecordId::Token(s) => LEGACY_ID_REGEX.is_match(s),
        }
    }

    /// Returns `true` for a canonical lowercase, hyphenated UUID v4.
    pub fn is_token(&self) -> bool {
        matches!(self, RecordId::Token(s) if is_token(s))
    }
}
impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RecordId::Legacy(n) => write!(f, "{n}"),
            RecordId::Token(s) => write!(f, "{s}"),
        }
    }
}
impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Token(value.to_string())
    }
}

/// Returns `true` if the string is a canonical lowercase, hyphenated UUID v4.
pub fn is_token(s: &str) -> bool {
    TOKEN_ID_REGEX.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RecordId::Legacy(12), true, false)]
    #[case(RecordId::from("12"), true, false)]
    #[case(RecordId::from("0b7e1c3a-5f2d-4e8a-9c61-3d2f1a4b5c6d"), false, true)]
    #[case(RecordId::from("0B7E1C3A-5F2D-4E8A-9C61-3D2F1A4B5C6D"), false, false)]
    #[case(RecordId::from("not-an-id"), false, false)]
    fn test_scheme(#[case] id: RecordId, #[case] legacy: bool, #[case] token: bool) {
        assert_eq!(id.is_legacy(), legacy);
        assert_eq!(id.is_token(), token);
    }

    #[test]
    fn test_deserialize_both_schemes() {
        let legacy: RecordId = serde_yaml::from_str("42").unwrap();
        assert_eq!(legacy, RecordId::Legacy(42));
        let token: RecordId = serde_yaml::from_str("0b7e1c3a-5f2d-4e8a-9c61-3d2f1a4b5c6d").unwrap();
        assert!(token.is_token());
    }
}
