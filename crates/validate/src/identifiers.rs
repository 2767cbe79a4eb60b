use crate::codes::ErrorCode;
use crate::issue::{Findings, Issue};
use gearbase_records::models::RecordId;
use gearbase_records::slug;
use serde_yaml::{Mapping, Value};

/// Checks the storage key (file stem) against the slug pattern.
pub(crate) fn check_slug(slug: &str, findings: &mut Findings<'_>) {
    if slug::is_valid_slug_format(slug) {
        return;
    }
    let generated = slug::generate(slug);
    findings.push(
        Issue::new(ErrorCode::SlugFormat, "", format!("file name `{slug}` is not a valid slug"))
            .with_suggestion((!generated.is_empty()).then_some(generated)),
    );
}

/// Checks the record's `id` field.
///
/// Values of the wrong type are left to the structural checks.
pub(crate) fn check_id(record: &Mapping, require_ids: bool, findings: &mut Findings<'_>) {
    let id = match record.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(RecordId::Token(s.clone())),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(n) => Some(RecordId::Legacy(n)),
            None => {
                findings.push(Issue::new(ErrorCode::InvalidId, "id", format!("`{n}` is not a valid id")));
                return;
            },
        },
        Some(_) => return,
    };
    match id {
        None if require_ids => findings.push(Issue::new(ErrorCode::MissingId, "", "record has no id")),
        None => {},
        Some(id) if id.is_legacy() => findings.push(Issue::new(
            ErrorCode::LegacyId,
            "id",
            format!("legacy numeric id `{id}` must be migrated to a UUID"),
        )),
        Some(id) if !id.is_token() => findings.push(Issue::new(
            ErrorCode::InvalidId,
            "id",
            format!("`{id}` is not a lowercase hyphenated UUID v4"),
        )),
        Some(_) => {},
    }
}
