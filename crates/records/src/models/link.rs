use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A typed external link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Link {
    #[serde(rename = "type")]
    pub kind: LinkKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Link type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Website,
    Manual,
    Download,
    Purchase,
    /// Must point at a canonical video host and path shape.
    Video,
    Changelog,
    Source,
    Other,
}
impl LinkKind {
    /// Every accepted spelling, for validation and suggestions.
    pub const NAMES: &'static [&'static str] =
        &["website", "manual", "download", "purchase", "video", "changelog", "source", "other"];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Website => "website",
            LinkKind::Manual => "manual",
            LinkKind::Download => "download",
            LinkKind::Purchase => "purchase",
            LinkKind::Video => "video",
            LinkKind::Changelog => "changelog",
            LinkKind::Source => "source",
            LinkKind::Other => "other",
        }
    }
}
impl Display for LinkKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// An image of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Image {
    /// Source URL.
    pub url: String,
    pub alt: String,
    /// Display order; defaults to the image's index in the list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}
