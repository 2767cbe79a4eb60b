use crate::models::{Image, Io, Link, Price, RecordId, ReleaseDate, Translation, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A hardware device: synthesizer, interface, controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Hardware {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub name: String,
    /// Slug of the owning manufacturer.
    pub manufacturer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub io: Vec<Io>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revisions: Vec<Revision>,
    /// Firmware versions of the base device.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<Version>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prices: Vec<Price>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub translations: BTreeMap<String, Translation>,
}
impl Hardware {
    /// The IO list in effect for a revision.
    ///
    /// A revision that declares its own `io` list replaces the device's list
    /// entirely; the two are never merged. A revision without one (or an
    /// out-of-range index) falls back to the device's list.
    pub fn effective_io(&self, revision: usize) -> &[Io] {
        match self.revisions.get(revision).and_then(|r| r.io.as_deref()) {
            Some(io) => io,
            None => &self.io,
        }
    }
}

/// A hardware revision (mk2, v1.1, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Revision {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<ReleaseDate>,
    #[serde(default)]
    pub release_date_year_only: bool,
    #[serde(default)]
    pub pre_release: bool,
    #[serde(default)]
    pub unofficial: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prices: Vec<Price>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    /// When present, replaces the device-level IO list for this revision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io: Option<Vec<Io>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<Version>,
}
