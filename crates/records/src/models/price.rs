use serde::{Deserialize, Serialize};

/// A price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Price {
    pub amount: f64,
    /// ISO-4217 currency code, e.g. `"USD"`.
    pub currency: String,
    /// Date (`YYYY-MM-DD`) the price was last confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_on: Option<String>,
    /// Where the price was observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}
