use crate::Collection;
use crate::document::Document;
use crate::error::{ErrorKind, Result};
use crate::models::{Hardware, Image, Link, Manufacturer, Price, RecordId, Software, Translation, Version};
use exn::ResultExt;
use std::collections::BTreeMap;
use tracing::instrument;

/// A typed record together with its storage key.
///
/// The slug is not part of the document: it is the filename stem, and the
/// filename is authoritative.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub slug: String,
    pub data: RecordData,
}

/// The three record variants.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordData {
    Manufacturer(Manufacturer),
    Software(Software),
    Hardware(Hardware),
}

impl Record {
    /// Parses the YAML text of a record file into its typed form.
    ///
    /// This is strict: any structural mismatch is an error. Use the validation
    /// engine to obtain a full list of issues instead of the first one.
    #[instrument(skip_all, fields(%collection, text_size = text.len()))]
    pub fn parse(collection: Collection, slug: impl Into<String>, text: &str) -> Result<Self> {
        let document = Document::parse(text)?;
        Self::from_document(collection, slug, &document)
    }

    /// Converts an already-parsed document into a typed record.
    pub fn from_document(collection: Collection, slug: impl Into<String>, document: &Document) -> Result<Self> {
        if !document.value().is_mapping() {
            exn::bail!(ErrorKind::NotAMapping);
        }
        let value = document.value().clone();
        let schema = || ErrorKind::Schema(collection.as_str());
        let data = match collection {
            Collection::Manufacturers => RecordData::Manufacturer(serde_yaml::from_value(value).or_raise(schema)?),
            Collection::Software => RecordData::Software(serde_yaml::from_value(value).or_raise(schema)?),
            Collection::Hardware => RecordData::Hardware(serde_yaml::from_value(value).or_raise(schema)?),
        };
        Ok(Self { slug: slug.into(), data })
    }

    pub fn collection(&self) -> Collection {
        match self.data {
            RecordData::Manufacturer(_) => Collection::Manufacturers,
            RecordData::Software(_) => Collection::Software,
            RecordData::Hardware(_) => Collection::Hardware,
        }
    }

    pub fn id(&self) -> Option<&RecordId> {
        match &self.data {
            RecordData::Manufacturer(m) => m.id.as_ref(),
            RecordData::Software(s) => s.id.as_ref(),
            RecordData::Hardware(h) => h.id.as_ref(),
        }
    }

    pub fn name(&self) -> &str {
        match &self.data {
            RecordData::Manufacturer(m) => &m.name,
            RecordData::Software(s) => &s.name,
            RecordData::Hardware(h) => &h.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match &self.data {
            RecordData::Manufacturer(m) => m.description.as_deref(),
            RecordData::Software(s) => s.description.as_deref(),
            RecordData::Hardware(h) => h.description.as_deref(),
        }
    }

    /// Slug of the owning manufacturer; `None` for manufacturers themselves.
    pub fn manufacturer(&self) -> Option<&str> {
        match &self.data {
            RecordData::Manufacturer(_) => None,
            RecordData::Software(s) => Some(&s.manufacturer),
            RecordData::Hardware(h) => Some(&h.manufacturer),
        }
    }

    /// Categories as written (not normalized).
    pub fn categories(&self) -> &[String] {
        match &self.data {
            RecordData::Manufacturer(_) => &[],
            RecordData::Software(s) => &s.categories,
            RecordData::Hardware(h) => &h.categories,
        }
    }

    pub fn primary_category(&self) -> Option<&str> {
        match &self.data {
            RecordData::Manufacturer(_) => None,
            RecordData::Software(s) => s.primary_category.as_deref(),
            RecordData::Hardware(h) => h.primary_category.as_deref(),
        }
    }

    pub fn secondary_category(&self) -> Option<&str> {
        match &self.data {
            RecordData::Manufacturer(_) => None,
            RecordData::Software(s) => s.secondary_category.as_deref(),
            RecordData::Hardware(h) => h.secondary_category.as_deref(),
        }
    }

    pub fn versions(&self) -> &[Version] {
        match &self.data {
            RecordData::Manufacturer(_) => &[],
            RecordData::Software(s) => &s.versions,
            RecordData::Hardware(h) => &h.versions,
        }
    }

    pub fn prices(&self) -> &[Price] {
        match &self.data {
            RecordData::Manufacturer(_) => &[],
            RecordData::Software(s) => &s.prices,
            RecordData::Hardware(h) => &h.prices,
        }
    }

    pub fn links(&self) -> &[Link] {
        match &self.data {
            RecordData::Manufacturer(m) => &m.links,
            RecordData::Software(s) => &s.links,
            RecordData::Hardware(h) => &h.links,
        }
    }

    pub fn images(&self) -> &[Image] {
        match &self.data {
            RecordData::Manufacturer(m) => &m.images,
            RecordData::Software(s) => &s.images,
            RecordData::Hardware(h) => &h.images,
        }
    }

    pub fn translations(&self) -> &BTreeMap<String, Translation> {
        match &self.data {
            RecordData::Manufacturer(m) => &m.translations,
            RecordData::Software(s) => &s.translations,
            RecordData::Hardware(h) => &h.translations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_software() {
        let record = Record::parse(
            Collection::Software,
            "serum",
            "name: Serum\nmanufacturer: xfer-records\ncategories: [synth, wavetable]\nformats: [vst3, au]\n",
        )
        .unwrap();
        assert_eq!(record.collection(), Collection::Software);
        assert_eq!(record.slug, "serum");
        assert_eq!(record.manufacturer(), Some("xfer-records"));
        assert_eq!(record.categories(), ["synth", "wavetable"]);
        assert_eq!(record.id(), None);
    }

    #[test]
    fn test_parse_manufacturer_has_no_categories() {
        let record = Record::parse(Collection::Manufacturers, "moog", "id: 12\nname: Moog Music\n").unwrap();
        assert!(record.categories().is_empty());
        assert_eq!(record.manufacturer(), None);
        assert!(record.id().unwrap().is_legacy());
    }

    #[test]
    fn test_unknown_field_is_schema_error() {
        let err = Record::parse(Collection::Manufacturers, "moog", "name: Moog\nfounded: 1953\n").unwrap_err();
        assert_eq!(*err, ErrorKind::Schema("manufacturers"));
    }

    #[test]
    fn test_scalar_document_is_not_a_mapping() {
        let err = Record::parse(Collection::Software, "serum", "just a string\n").unwrap_err();
        assert_eq!(*err, ErrorKind::NotAMapping);
    }

    #[test]
    fn test_syntax_error() {
        let err = Record::parse(Collection::Software, "serum", "name: [unclosed\n").unwrap_err();
        assert!(matches!(*err, ErrorKind::Syntax { .. }));
    }
}
