use crate::error::{Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// The three top-level record collections.
///
/// Ordering follows foreign-key dependencies: manufacturers are referenced by
/// software and hardware, never the other way around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Manufacturers,
    Software,
    Hardware,
}
impl Collection {
    /// Every collection, in dependency order.
    pub const ALL: [Collection; 3] = [Collection::Manufacturers, Collection::Software, Collection::Hardware];

    /// Returns the collection name, which doubles as its directory name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Manufacturers => "manufacturers",
            Collection::Software => "software",
            Collection::Hardware => "hardware",
        }
    }

    /// Name of the table holding the top-level rows of this collection.
    pub fn table(&self) -> &'static str {
        self.as_str()
    }

    /// Name of the full-text shadow table for this collection.
    pub fn fts_table(&self) -> &'static str {
        match self {
            Collection::Manufacturers => "manufacturers_fts",
            Collection::Software => "software_fts",
            Collection::Hardware => "hardware_fts",
        }
    }

    /// Whether records in this collection reference a manufacturer.
    pub fn has_manufacturer(&self) -> bool {
        !matches!(self, Collection::Manufacturers)
    }
}
impl FromStr for Collection {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "manufacturers" | "manufacturer" => Self::Manufacturers,
            "software" => Self::Software,
            "hardware" => Self::Hardware,
            _ => exn::bail!(ErrorKind::UnknownCollection(s.to_string())),
        })
    }
}
impl Display for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}
