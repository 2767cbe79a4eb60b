use crate::models::{Link, Price};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// A released version of a product (or firmware version of a device).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Version {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<ReleaseDate>,
    /// Must be set when `release_date` is a bare year.
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
}

/// A release date as written in a record: either a full `YYYY-MM-DD` date or,
/// when the exact day is unknown, a bare year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReleaseDate {
    Year(i32),
    Text(String),
}
impl Display for ReleaseDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ReleaseDate::Year(year) => write!(f, "{year:04}"),
            ReleaseDate::Text(text) => write!(f, "{text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_only_release() {
        let version: Version = serde_yaml::from_str("name: '1.0'\nreleaseDate: 2019\nreleaseDateYearOnly: true\n").unwrap();
        assert_eq!(version.release_date, Some(ReleaseDate::Year(2019)));
        assert!(version.release_date_year_only);
        assert_eq!(version.release_date.unwrap().to_string(), "2019");
    }

    #[test]
    fn test_full_release_date() {
        let version: Version = serde_yaml::from_str("name: '2.1'\nreleaseDate: 2021-03-09\n").unwrap();
        assert_eq!(version.release_date, Some(ReleaseDate::Text("2021-03-09".to_string())));
        assert!(!version.release_date_year_only);
        assert!(!version.pre_release);
    }
}
