//! Structural validation against a declarative field table.
//!
//! Each collection's record shape is described by static [`Shape`]s. The
//! walker visits the untyped YAML value alongside the table, so that every
//! problem in a document is reported (not just the first one `serde` trips
//! over) with its exact field path.

use crate::codes::ErrorCode;
use crate::issue::{Findings, Issue};
use crate::markup;
use gearbase_records::Collection;
use gearbase_records::models::{IoCategory, IoPosition, LinkKind, SignalFlow};
use gearbase_records::slug;
use gearbase_schema::suggest::nearest;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::LazyLock;
use time::Date;
use time::macros::format_description;
use url::Url;

static CURRENCY_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").unwrap());
static VIDEO_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

pub(crate) enum Kind {
    /// Any string; checked as markup.
    Markup,
    /// Non-empty string.
    Name,
    Slug,
    Url,
    /// `YYYY-MM-DD`.
    Date,
    Bool,
    /// Number, at least zero.
    Amount,
    /// Integer from one to `u32::MAX`.
    Count,
    /// Integer from zero to `u32::MAX`.
    Index,
    /// String or integer; the identifier rules apply separately.
    Id,
    /// String or integer; see [`Rule::Dated`].
    ReleaseDate,
    Currency,
    Enum(&'static [&'static str]),
    List(&'static Kind),
    /// Mapping with string keys and uniform values.
    Map(&'static Kind),
    Object(&'static Shape),
}

pub(crate) struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
}

/// Cross-field checks applied to an object after its fields.
pub(crate) enum Rule {
    None,
    /// `video` links must use a canonical video URL.
    Link,
    /// Release dates are full dates, or 4-digit years flagged `releaseDateYearOnly`.
    Dated,
}

pub(crate) struct Shape {
    pub fields: &'static [Field],
    pub rule: Rule,
}

macro_rules! field {
    ($name:literal, $kind:expr) => {
        Field { name: $name, kind: $kind, required: false }
    };
    ($name:literal, $kind:expr, required) => {
        Field { name: $name, kind: $kind, required: true }
    };
}

const PRICE: Shape = Shape {
    fields: &[
        field!("amount", Kind::Amount, required),
        field!("currency", Kind::Currency, required),
        field!("verifiedOn", Kind::Date),
        field!("source", Kind::Url),
    ],
    rule: Rule::None,
};

const LINK: Shape = Shape {
    fields: &[
        field!("type", Kind::Enum(LinkKind::NAMES), required),
        field!("url", Kind::Url, required),
        field!("title", Kind::Name),
    ],
    rule: Rule::Link,
};

const IMAGE: Shape = Shape {
    fields: &[field!("url", Kind::Url, required), field!("alt", Kind::Name, required), field!("position", Kind::Index)],
    rule: Rule::None,
};

const TRANSLATION: Shape = Shape {
    fields: &[field!("name", Kind::Name), field!("description", Kind::Markup), field!("details", Kind::Markup)],
    rule: Rule::None,
};

const IO: Shape = Shape {
    fields: &[
        field!("name", Kind::Name, required),
        field!("signalFlow", Kind::Enum(SignalFlow::NAMES), required),
        field!("category", Kind::Enum(IoCategory::NAMES), required),
        field!("type", Kind::Name, required),
        field!("maxConnections", Kind::Count),
        field!("position", Kind::Enum(IoPosition::NAMES)),
    ],
    rule: Rule::None,
};

const VERSION: Shape = Shape {
    fields: &[
        field!("name", Kind::Name, required),
        field!("releaseDate", Kind::ReleaseDate),
        field!("releaseDateYearOnly", Kind::Bool),
        field!("preRelease", Kind::Bool),
        field!("unofficial", Kind::Bool),
        field!("prices", Kind::List(&Kind::Object(&PRICE))),
        field!("links", Kind::List(&Kind::Object(&LINK))),
    ],
    rule: Rule::Dated,
};

const REVISION: Shape = Shape {
    fields: &[
        field!("name", Kind::Name, required),
        field!("releaseDate", Kind::ReleaseDate),
        field!("releaseDateYearOnly", Kind::Bool),
        field!("preRelease", Kind::Bool),
        field!("unofficial", Kind::Bool),
        field!("prices", Kind::List(&Kind::Object(&PRICE))),
        field!("links", Kind::List(&Kind::Object(&LINK))),
        field!("io", Kind::List(&Kind::Object(&IO))),
        field!("versions", Kind::List(&Kind::Object(&VERSION))),
    ],
    rule: Rule::Dated,
};

const MANUFACTURER: Shape = Shape {
    fields: &[
        field!("id", Kind::Id),
        field!("name", Kind::Name, required),
        field!("description", Kind::Markup),
        field!("website", Kind::Url),
        field!("country", Kind::Name),
        field!("links", Kind::List(&Kind::Object(&LINK))),
        field!("images", Kind::List(&Kind::Object(&IMAGE))),
        field!("translations", Kind::Map(&Kind::Object(&TRANSLATION))),
    ],
    rule: Rule::None,
};

const SOFTWARE: Shape = Shape {
    fields: &[
        field!("id", Kind::Id),
        field!("name", Kind::Name, required),
        field!("manufacturer", Kind::Slug, required),
        field!("description", Kind::Markup),
        field!("details", Kind::Markup),
        field!("categories", Kind::List(&Kind::Name)),
        field!("primaryCategory", Kind::Name),
        field!("secondaryCategory", Kind::Name),
        field!("formats", Kind::List(&Kind::Name)),
        field!("identifiers", Kind::Map(&Kind::Name)),
        field!("platforms", Kind::List(&Kind::Name)),
        field!("versions", Kind::List(&Kind::Object(&VERSION))),
        field!("prices", Kind::List(&Kind::Object(&PRICE))),
        field!("links", Kind::List(&Kind::Object(&LINK))),
        field!("images", Kind::List(&Kind::Object(&IMAGE))),
        field!("translations", Kind::Map(&Kind::Object(&TRANSLATION))),
    ],
    rule: Rule::None,
};

const HARDWARE: Shape = Shape {
    fields: &[
        field!("id", Kind::Id),
        field!("name", Kind::Name, required),
        field!("manufacturer", Kind::Slug, required),
        field!("description", Kind::Markup),
        field!("details", Kind::Markup),
        field!("specs", Kind::Markup),
        field!("categories", Kind::List(&Kind::Name)),
        field!("primaryCategory", Kind::Name),
        field!("secondaryCategory", Kind::Name),
        field!("io", Kind::List(&Kind::Object(&IO))),
        field!("revisions", Kind::List(&Kind::Object(&REVISION))),
        field!("versions", Kind::List(&Kind::Object(&VERSION))),
        field!("prices", Kind::List(&Kind::Object(&PRICE))),
        field!("links", Kind::List(&Kind::Object(&LINK))),
        field!("images", Kind::List(&Kind::Object(&IMAGE))),
        field!("translations", Kind::Map(&Kind::Object(&TRANSLATION))),
    ],
    rule: Rule::None,
};

pub(crate) fn shape(collection: Collection) -> &'static Shape {
    match collection {
        Collection::Manufacturers => &MANUFACTURER,
        Collection::Software => &SOFTWARE,
        Collection::Hardware => &HARDWARE,
    }
}

/// Validates a record's top-level mapping against its collection's shape.
pub(crate) fn check(collection: Collection, record: &Mapping, findings: &mut Findings<'_>) {
    check_object(shape(collection), record, "", findings);
}

fn join(parent: &str, child: &str) -> String {
    match parent.is_empty() {
        true => child.to_string(),
        false => format!("{parent}.{child}"),
    }
}

pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn type_error(path: &str, expected: &str, value: &Value) -> Issue {
    Issue::new(ErrorCode::Type, path, format!("expected {expected}, found {}", describe(value)))
}

fn check_object(shape: &Shape, map: &Mapping, path: &str, findings: &mut Findings<'_>) {
    for key in map.keys() {
        let Some(key) = key.as_str() else {
            findings.push(Issue::new(ErrorCode::Type, path, "mapping keys must be strings"));
            continue;
        };
        if !shape.fields.iter().any(|f| f.name == key) {
            let suggestion = nearest(key, shape.fields.iter().map(|f| f.name));
            findings.push(
                Issue::new(ErrorCode::UnknownField, join(path, key), format!("unknown field `{key}`"))
                    .with_suggestion(suggestion),
            );
        }
    }
    for field in shape.fields {
        let field_path = join(path, field.name);
        match map.get(field.name) {
            None | Some(Value::Null) if field.required => findings.push(Issue::new(
                ErrorCode::Required,
                field_path,
                format!("missing required field `{}`", field.name),
            )),
            None | Some(Value::Null) => {},
            Some(value) => check_value(&field.kind, value, &field_path, findings),
        }
    }
    match shape.rule {
        Rule::None => {},
        Rule::Link => check_video_link(map, path, findings),
        Rule::Dated => check_release_date(map, path, findings),
    }
}

fn check_value(kind: &Kind, value: &Value, path: &str, findings: &mut Findings<'_>) {
    match kind {
        Kind::Markup => match value.as_str() {
            Some(text) => markup::check(text, path, findings),
            None => findings.push(type_error(path, "a string", value)),
        },
        Kind::Name => match value.as_str() {
            Some(text) if text.trim().is_empty() => findings.push(Issue::new(ErrorCode::Empty, path, "must not be empty")),
            Some(_) => {},
            None => findings.push(type_error(path, "a string", value)),
        },
        Kind::Slug => match value.as_str() {
            Some(text) if !slug::is_valid_slug_format(text) => {
                let generated = slug::generate(text);
                findings.push(
                    Issue::new(ErrorCode::SlugFormat, path, format!("`{text}` is not a valid slug"))
                        .with_suggestion((!generated.is_empty()).then_some(generated)),
                )
            },
            Some(_) => {},
            None => findings.push(type_error(path, "a string", value)),
        },
        Kind::Url => match value.as_str() {
            Some(text) if !is_web_url(text) => {
                findings.push(Issue::new(ErrorCode::Url, path, format!("`{text}` is not an http(s) URL")))
            },
            Some(_) => {},
            None => findings.push(type_error(path, "a string", value)),
        },
        Kind::Date => match value.as_str() {
            Some(text) if !is_date(text) => {
                findings.push(Issue::new(ErrorCode::Date, path, format!("`{text}` is not a YYYY-MM-DD date")))
            },
            Some(_) => {},
            None => findings.push(type_error(path, "a YYYY-MM-DD date", value)),
        },
        Kind::Bool => {
            if !value.is_bool() {
                findings.push(type_error(path, "a boolean", value));
            }
        },
        Kind::Amount => match value.as_f64() {
            Some(amount) if amount < 0.0 || !amount.is_finite() => {
                findings.push(Issue::new(ErrorCode::Range, path, "amount must be zero or more"))
            },
            Some(_) => {},
            None => findings.push(type_error(path, "a number", value)),
        },
        Kind::Count | Kind::Index => {
            let minimum = if matches!(kind, Kind::Count) { 1 } else { 0 };
            let maximum = i64::from(u32::MAX);
            match value.as_i64() {
                Some(n) if n < minimum => {
                    findings.push(Issue::new(ErrorCode::Range, path, format!("must be at least {minimum}")))
                },
                Some(n) if n > maximum => {
                    findings.push(Issue::new(ErrorCode::Range, path, format!("must be at most {maximum}")))
                },
                Some(_) => {},
                None if value.as_u64().is_some() => {
                    findings.push(Issue::new(ErrorCode::Range, path, format!("must be at most {maximum}")))
                },
                None => findings.push(type_error(path, "an integer", value)),
            }
        },
        Kind::Id | Kind::ReleaseDate => {
            if !(value.is_string() || value.is_i64() || value.is_u64()) {
                findings.push(type_error(path, "a string or an integer", value));
            }
        },
        Kind::Currency => match value.as_str() {
            Some(text) if !CURRENCY_REGEX.is_match(text) => {
                let upper = text.trim().to_uppercase();
                findings.push(
                    Issue::new(ErrorCode::Currency, path, format!("`{text}` is not a three-letter ISO-4217 code"))
                        .with_suggestion(CURRENCY_REGEX.is_match(&upper).then_some(upper)),
                )
            },
            Some(_) => {},
            None => findings.push(type_error(path, "a currency code", value)),
        },
        Kind::Enum(names) => match value.as_str() {
            Some(text) if !names.contains(&text) => findings.push(
                Issue::new(
                    ErrorCode::Enum,
                    path,
                    format!(
                        "`{text}` is not one of {}",
                        gearbase_schema::suggest::truncate_options(
                            names.iter().copied(),
                            gearbase_schema::suggest::OPTION_DISPLAY_LIMIT
                        )
                    ),
                )
                .with_suggestion(nearest(text, names.iter().copied())),
            ),
            Some(_) => {},
            None => findings.push(type_error(path, "a string", value)),
        },
        Kind::List(inner) => match value.as_sequence() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    check_value(inner, item, &join(path, &i.to_string()), findings);
                }
            },
            None => findings.push(type_error(path, "a list", value)),
        },
        Kind::Map(inner) => match value.as_mapping() {
            Some(map) => {
                for (key, item) in map {
                    match key.as_str() {
                        Some(key) => check_value(inner, item, &join(path, key), findings),
                        None => findings.push(Issue::new(ErrorCode::Type, path, "mapping keys must be strings")),
                    }
                }
            },
            None => findings.push(type_error(path, "a mapping", value)),
        },
        Kind::Object(shape) => match value.as_mapping() {
            Some(map) => check_object(shape, map, path, findings),
            None => findings.push(type_error(path, "a mapping", value)),
        },
    }
}

fn check_video_link(map: &Mapping, path: &str, findings: &mut Findings<'_>) {
    if map.get("type").and_then(Value::as_str) != Some(LinkKind::Video.as_str()) {
        return;
    }
    let Some(url) = map.get("url").and_then(Value::as_str) else {
        return;
    };
    if is_web_url(url) && !is_video_link(url) {
        findings.push(Issue::new(
            ErrorCode::VideoLink,
            join(path, "url"),
            format!("`{url}` is not a canonical YouTube or Vimeo video URL"),
        ));
    }
}

fn check_release_date(map: &Mapping, path: &str, findings: &mut Findings<'_>) {
    let year_only = map.get("releaseDateYearOnly").and_then(Value::as_bool) == Some(true);
    let date_path = join(path, "releaseDate");
    match map.get("releaseDate") {
        None | Some(Value::Null) if year_only => findings.push(Issue::new(
            ErrorCode::YearOnly,
            join(path, "releaseDateYearOnly"),
            "`releaseDateYearOnly` is set but there is no `releaseDate`",
        )),
        Some(Value::Number(n)) if !year_only => findings.push(Issue::new(
            ErrorCode::YearOnly,
            date_path,
            format!("release year `{n}` needs `releaseDateYearOnly: true`"),
        )),
        Some(Value::Number(n)) if !n.as_i64().is_some_and(|y| (1000..=9999).contains(&y)) => {
            findings.push(Issue::new(ErrorCode::YearOnly, date_path, format!("`{n}` is not a 4-digit year")))
        },
        Some(Value::String(text)) if year_only && !is_year(text) => findings.push(Issue::new(
            ErrorCode::YearOnly,
            date_path,
            format!("year-only release date `{text}` must be a 4-digit year"),
        )),
        Some(Value::String(text)) if !year_only && !is_date(text) => {
            findings.push(Issue::new(ErrorCode::Date, date_path, format!("`{text}` is not a YYYY-MM-DD date")))
        },
        _ => {},
    }
}

pub(crate) fn is_web_url(text: &str) -> bool {
    Url::parse(text).is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
}

pub(crate) fn is_date(text: &str) -> bool {
    Date::parse(text, format_description!("[year]-[month]-[day]")).is_ok()
}

fn is_year(text: &str) -> bool {
    text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit())
}

/// `https://www.youtube.com/watch?v=<id>`, `https://youtu.be/<id>` or `https://vimeo.com/<digits>`.
pub(crate) fn is_video_link(text: &str) -> bool {
    let Ok(url) = Url::parse(text) else {
        return false;
    };
    if url.scheme() != "https" {
        return false;
    }
    let segments: Vec<&str> = url.path_segments().map(|s| s.filter(|s| !s.is_empty()).collect()).unwrap_or_default();
    match url.host_str() {
        Some("www.youtube.com") => {
            segments == ["watch"] && url.query_pairs().any(|(k, v)| k == "v" && VIDEO_ID_REGEX.is_match(&v))
        },
        Some("youtu.be") => matches!(segments.as_slice(), [id] if VIDEO_ID_REGEX.is_match(id)),
        Some("vimeo.com") => matches!(segments.as_slice(), [id] if id.bytes().all(|b| b.is_ascii_digit())),
        _ => false,
    }
}
