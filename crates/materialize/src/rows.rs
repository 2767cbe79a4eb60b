//! Field mapping from typed records to table rows.
//!
//! Both materialization modes go through here: a full rebuild binds the
//! resulting [`Statement`]s as query parameters, a patch renders them as SQL
//! text. Sharing the mapping is what keeps the two modes convergent.

use crate::error::{ErrorKind, Result};
use crate::sql::{Value, quote};
use gearbase_records::models::{Hardware, Io, Link, Price, Software, Version};
use gearbase_records::{Collection, Record, RecordData};
use gearbase_schema::Registry;

/// Device-level IO rows use this revision number.
pub const DEVICE_REVISION: i64 = -1;

/// Every table holding dataset content, `metadata` excluded.
pub const DATA_TABLES: &[&str] = &[
    "records",
    "manufacturers",
    "software",
    "hardware",
    "record_categories",
    "software_formats",
    "software_platforms",
    "versions",
    "revisions",
    "revision_versions",
    "io_ports",
    "prices",
    "links",
    "images",
    "translations",
    "manufacturers_fts",
    "software_fts",
    "hardware_fts",
];

/// Tables whose rows hang off a record of the collection through `owner_id`.
pub fn child_tables(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Manufacturers => &["links", "images", "translations"],
        Collection::Software => &[
            "record_categories",
            "software_formats",
            "software_platforms",
            "versions",
            "prices",
            "links",
            "images",
            "translations",
        ],
        Collection::Hardware => &[
            "record_categories",
            "versions",
            "revisions",
            "revision_versions",
            "io_ports",
            "prices",
            "links",
            "images",
            "translations",
        ],
    }
}

/// One row of one table, columns in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub table: &'static str,
    pub columns: Vec<(&'static str, Value)>,
}
impl Row {
    pub fn new(table: &'static str) -> Self {
        Self { table, columns: Vec::new() }
    }

    pub fn with(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.columns.push((column, value.into()));
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.iter().find(|(name, _)| *name == column).map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert(Row),
    /// Insert, or update every non-key column of the row already holding `key`.
    Upsert { row: Row, key: &'static str },
    Delete { table: &'static str, column: &'static str, value: Value },
}
impl Statement {
    /// The statement with `?` placeholders, for binding [`Statement::values`].
    pub fn sql(&self) -> String {
        self.build(|_| "?".to_string())
    }

    /// The statement with every value inlined as a literal, `;`-terminated.
    pub fn render(&self) -> String {
        let mut sql = self.build(quote);
        sql.push(';');
        sql
    }

    /// Values in placeholder order.
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Statement::Insert(row) | Statement::Upsert { row, .. } => row.columns.iter().map(|(_, v)| v).collect(),
            Statement::Delete { value, .. } => vec![value],
        }
    }

    fn build(&self, value: impl Fn(&Value) -> String) -> String {
        match self {
            Statement::Insert(row) => insert(row, &value),
            Statement::Upsert { row, key } => {
                let updates: Vec<String> = row
                    .columns
                    .iter()
                    .filter(|(name, _)| name != key)
                    .map(|(name, _)| format!("{name} = excluded.{name}"))
                    .collect();
                format!("{} ON CONFLICT({key}) DO UPDATE SET {}", insert(row, &value), updates.join(", "))
            },
            Statement::Delete { table, column, value: v } => {
                format!("DELETE FROM {table} WHERE {column} = {}", value(v))
            },
        }
    }
}

fn insert(row: &Row, value: &impl Fn(&Value) -> String) -> String {
    let names: Vec<&str> = row.columns.iter().map(|(name, _)| *name).collect();
    let values: Vec<String> = row.columns.iter().map(|(_, v)| value(v)).collect();
    format!("INSERT INTO {} ({}) VALUES ({})", row.table, names.join(", "), values.join(", "))
}

/// The owning manufacturer of a product, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Maker {
    pub id: String,
    pub name: String,
}
impl Maker {
    /// Reads the maker of a manufacturer record; `None` for other collections.
    pub fn of(record: &Record) -> Result<Option<Self>> {
        let RecordData::Manufacturer(manufacturer) = &record.data else {
            return Ok(None);
        };
        Ok(Some(Self { id: stored_id(record)?, name: manufacturer.name.clone() }))
    }
}

/// The rows materializing one record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRows {
    pub id: String,
    /// The `records` row, then the collection's own row.
    pub parents: Vec<Row>,
    pub children: Vec<Row>,
    pub search: Row,
}

pub(crate) fn stored_id(record: &Record) -> Result<String> {
    match record.id() {
        Some(id) => Ok(id.to_string()),
        None => exn::bail!(ErrorKind::MissingId { collection: record.collection(), slug: record.slug.clone() }),
    }
}

/// Maps a record to rows.
///
/// `maker` is the record's manufacturer; it is required for software and
/// hardware and ignored for manufacturers.
pub fn record_rows(record: &Record, registry: &Registry, maker: Option<&Maker>) -> Result<RecordRows> {
    let id = stored_id(record)?;
    let collection = record.collection();
    let maker = match (record.manufacturer(), maker) {
        (None, _) => None,
        (Some(_), Some(maker)) => Some(maker),
        (Some(slug), None) => exn::bail!(ErrorKind::UnknownManufacturer {
            slug: record.slug.clone(),
            manufacturer: slug.to_string(),
        }),
    };
    let primary = record.primary_category().map(|c| registry.normalize_category(c));
    let secondary = record.secondary_category().map(|c| registry.normalize_category(c));

    let mut parent = Row::new(collection.table()).with("id", &id).with("slug", &record.slug).with("name", record.name());
    let mut rows = Rows { id: &id, children: Vec::new() };
    match &record.data {
        RecordData::Manufacturer(m) => {
            parent = parent
                .with("description", m.description.as_deref())
                .with("website", m.website.as_deref())
                .with("country", m.country.as_deref());
        },
        RecordData::Software(s) => {
            parent = parent
                .with("manufacturer_id", maker.map(|m| m.id.as_str()))
                .with("description", s.description.as_deref())
                .with("details", s.details.as_deref())
                .with("primary_category", primary)
                .with("secondary_category", secondary);
            rows.software(s);
        },
        RecordData::Hardware(h) => {
            parent = parent
                .with("manufacturer_id", maker.map(|m| m.id.as_str()))
                .with("description", h.description.as_deref())
                .with("details", h.details.as_deref())
                .with("specs", h.specs.as_deref())
                .with("primary_category", primary)
                .with("secondary_category", secondary);
            rows.hardware(h);
        },
    }

    for (position, category) in record.categories().iter().enumerate() {
        rows.push(
            Row::new("record_categories")
                .with("position", index(position))
                .with("category", registry.normalize_category(category)),
        );
    }
    rows.versions("versions", None, record.versions());
    rows.prices("", record.prices());
    rows.links("", record.links());
    for (i, image) in record.images().iter().enumerate() {
        let position = image.position.map(Value::from).unwrap_or_else(|| index(i));
        rows.push(
            Row::new("images").with("position", position).with("url", &image.url).with("alt", &image.alt),
        );
    }
    for (locale, translation) in record.translations() {
        rows.push(
            Row::new("translations")
                .with("locale", locale)
                .with("name", translation.name.as_deref())
                .with("description", translation.description.as_deref())
                .with("details", translation.details.as_deref()),
        );
    }

    let search = Row::new(collection.fts_table())
        .with("id", &id)
        .with("name", record.name())
        .with("manufacturer", maker.map(|m| m.name.as_str()))
        .with("categories", search_categories(record, registry))
        .with("description", record.description());
    let children = rows.children;
    let parents = vec![Row::new("records").with("id", &id).with("collection", collection.as_str()), parent];
    Ok(RecordRows { id, parents, children, search })
}

/// Normalized categories, then the primary and secondary ones, each once.
fn search_categories(record: &Record, registry: &Registry) -> String {
    let mut seen: Vec<&str> = Vec::new();
    let all = record.categories().iter().map(String::as_str).chain(record.primary_category()).chain(record.secondary_category());
    for category in all.map(|c| registry.normalize_category(c)) {
        if !seen.contains(&category) {
            seen.push(category);
        }
    }
    seen.join(" ")
}

fn index(i: usize) -> Value {
    Value::Integer(i as i64)
}

/// Collects child rows, stamping each with the owner id.
struct Rows<'a> {
    id: &'a str,
    children: Vec<Row>,
}
impl Rows<'_> {
    fn push(&mut self, row: Row) {
        let mut columns = vec![("owner_id", Value::from(self.id))];
        columns.extend(row.columns);
        self.children.push(Row { table: row.table, columns });
    }

    fn software(&mut self, software: &Software) {
        let identifiers = &software.identifiers;
        let extra = identifiers.keys().filter(|key| !software.formats.contains(*key));
        for (position, format) in software.formats.iter().chain(extra).enumerate() {
            self.push(
                Row::new("software_formats")
                    .with("position", index(position))
                    .with("format", format)
                    .with("identifier", identifiers.get(format)),
            );
        }
        for (position, platform) in software.platforms.iter().enumerate() {
            self.push(Row::new("software_platforms").with("position", index(position)).with("platform", platform));
        }
    }

    fn hardware(&mut self, hardware: &Hardware) {
        self.io(DEVICE_REVISION, &hardware.io);
        for (r, revision) in hardware.revisions.iter().enumerate() {
            self.push(
                Row::new("revisions")
                    .with("position", index(r))
                    .with("name", &revision.name)
                    .with("release_date", revision.release_date.as_ref().map(ToString::to_string))
                    .with("release_year_only", revision.release_date_year_only)
                    .with("pre_release", revision.pre_release)
                    .with("unofficial", revision.unofficial),
            );
            self.prices(&format!("r{r}"), &revision.prices);
            self.links(&format!("r{r}"), &revision.links);
            self.versions("revision_versions", Some(r), &revision.versions);
            self.io(r as i64, hardware.effective_io(r));
        }
    }

    fn io(&mut self, revision: i64, ports: &[Io]) {
        for (position, port) in ports.iter().enumerate() {
            self.push(
                Row::new("io_ports")
                    .with("revision", revision)
                    .with("position", index(position))
                    .with("name", &port.name)
                    .with("signal_flow", port.signal_flow.as_str())
                    .with("category", port.category.as_str())
                    .with("connector", &port.connector)
                    .with("max_connections", port.max_connections)
                    .with("layout_position", port.position.map(|p| p.as_str())),
            );
        }
    }

    fn versions(&mut self, table: &'static str, revision: Option<usize>, versions: &[Version]) {
        for (v, version) in versions.iter().enumerate() {
            let mut row = Row::new(table);
            if let Some(r) = revision {
                row = row.with("revision", index(r));
            }
            self.push(
                row.with("position", index(v))
                    .with("name", &version.name)
                    .with("release_date", version.release_date.as_ref().map(ToString::to_string))
                    .with("release_year_only", version.release_date_year_only)
                    .with("pre_release", version.pre_release)
                    .with("unofficial", version.unofficial),
            );
            let scope = match revision {
                Some(r) => format!("r{r}v{v}"),
                None => format!("v{v}"),
            };
            self.prices(&scope, &version.prices);
            self.links(&scope, &version.links);
        }
    }

    fn prices(&mut self, scope: &str, prices: &[Price]) {
        for (position, price) in prices.iter().enumerate() {
            self.push(
                Row::new("prices")
                    .with("scope", scope)
                    .with("position", index(position))
                    .with("amount", price.amount)
                    .with("currency", &price.currency)
                    .with("verified_on", price.verified_on.as_deref())
                    .with("source", price.source.as_deref()),
            );
        }
    }

    fn links(&mut self, scope: &str, links: &[Link]) {
        for (position, link) in links.iter().enumerate() {
            self.push(
                Row::new("links")
                    .with("scope", scope)
                    .with("position", index(position))
                    .with("kind", link.kind.as_str())
                    .with("url", &link.url)
                    .with("title", link.title.as_deref()),
            );
        }
    }
}
