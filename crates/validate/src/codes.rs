use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Top-level grouping of [`ErrorCode`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Schema,
    Reference,
    Content,
    Identifier,
}
impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Schema => "schema",
            ErrorClass::Reference => "reference",
            ErrorClass::Content => "content",
            ErrorClass::Identifier => "identifier",
        }
    }
}
impl Display for ErrorClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

macro_rules! codes {
    ($($variant:ident => $class:ident, $name:literal),+ $(,)?) => {
        /// Stable identifier of a validation finding, `<class>/<name>`.
        ///
        /// The set is closed: tooling may match on these strings.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ErrorCode {
            $($variant),+
        }
        impl ErrorCode {
            pub const ALL: &'static [ErrorCode] = &[$(ErrorCode::$variant),+];

            pub fn class(&self) -> ErrorClass {
                match self {
                    $(ErrorCode::$variant => ErrorClass::$class),+
                }
            }

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ErrorCode::$variant => $name),+
                }
            }
        }
    };
}

codes! {
    YamlSyntax => Schema, "schema/yaml-syntax",
    NotAMapping => Schema, "schema/not-a-mapping",
    Required => Schema, "schema/required",
    Type => Schema, "schema/type",
    UnknownField => Schema, "schema/unknown-field",
    Empty => Schema, "schema/empty",
    SlugFormat => Schema, "schema/slug-format",
    Url => Schema, "schema/url",
    Date => Schema, "schema/date",
    YearOnly => Schema, "schema/year-only",
    VideoLink => Schema, "schema/video-link",
    Currency => Schema, "schema/currency",
    Range => Schema, "schema/range",
    Enum => Schema, "schema/enum",
    Category => Schema, "schema/category",
    Format => Schema, "schema/format",
    Platform => Schema, "schema/platform",
    Locale => Schema, "schema/locale",
    UnknownManufacturer => Reference, "reference/unknown-manufacturer",
    DuplicateCategory => Reference, "reference/duplicate-category",
    SlugCollision => Reference, "reference/slug-collision",
    UnclosedFence => Content, "content/unclosed-fence",
    UnbalancedInlineCode => Content, "content/unbalanced-inline-code",
    MissingId => Identifier, "identifier/missing",
    InvalidId => Identifier, "identifier/invalid",
    LegacyId => Identifier, "identifier/legacy",
    DuplicateId => Identifier, "identifier/duplicate",
    ChangedId => Identifier, "identifier/changed",
}

impl ErrorCode {
    /// Findings that fail the run on integrity grounds, even when every record
    /// is otherwise valid.
    pub fn is_integrity(&self) -> bool {
        matches!(self, ErrorCode::DuplicateId | ErrorCode::ChangedId)
    }
}
impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
