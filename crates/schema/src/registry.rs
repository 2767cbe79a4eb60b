use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::instrument;

pub const CATEGORIES_FILE: &str = "categories.yaml";
pub const FORMATS_FILE: &str = "formats.yaml";
pub const PLATFORMS_FILE: &str = "platforms.yaml";
pub const LOCALES_FILE: &str = "locales.yaml";

/// A supported locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Locale {
    /// Locale code, e.g. `"de"` or `"pt-BR"`.
    pub code: String,
    /// English display name.
    pub name: String,
    /// Name of the language in the language itself.
    pub native: String,
}

/// Raw vocabulary contents, before invariants are checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    pub categories: Vec<String>,
    /// Alias → canonical category.
    pub aliases: BTreeMap<String, String>,
    pub formats: Vec<String>,
    pub platforms: Vec<String>,
    pub locales: Vec<Locale>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoriesFile {
    categories: Vec<String>,
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FormatsFile {
    formats: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PlatformsFile {
    platforms: Vec<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LocalesFile {
    locales: Vec<Locale>,
}

/// The canonical vocabularies that record fields are checked against.
///
/// A registry is either complete or not constructed at all; there is no
/// partially loaded state. It holds no global cache: callers keep one per run
/// and rebuild it to pick up vocabulary changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    categories: BTreeSet<String>,
    aliases: BTreeMap<String, String>,
    formats: BTreeSet<String>,
    platforms: BTreeSet<String>,
    locales: BTreeMap<String, Locale>,
}
impl Registry {
    /// Builds a registry from in-memory vocabularies, checking its invariants.
    pub fn new(vocabulary: Vocabulary) -> Result<Self> {
        if vocabulary.categories.is_empty() {
            exn::bail!(ErrorKind::Empty("categories"));
        }
        let categories: BTreeSet<String> = vocabulary.categories.into_iter().collect();
        for (alias, target) in &vocabulary.aliases {
            if categories.contains(alias) {
                exn::bail!(ErrorKind::AmbiguousAlias(alias.clone()));
            }
            if !categories.contains(target) {
                exn::bail!(ErrorKind::UnknownAliasTarget {
                    alias: alias.clone(),
                    target: target.clone(),
                });
            }
        }
        Ok(Self {
            categories,
            aliases: vocabulary.aliases,
            formats: vocabulary.formats.into_iter().collect(),
            platforms: vocabulary.platforms.into_iter().collect(),
            locales: vocabulary.locales.into_iter().map(|l| (l.code.clone(), l)).collect(),
        })
    }

    /// Loads every vocabulary file from a schema directory.
    ///
    /// Any missing or malformed file fails the whole load.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let categories: CategoriesFile = read_file(&dir.join(CATEGORIES_FILE))?;
        let formats: FormatsFile = read_file(&dir.join(FORMATS_FILE))?;
        let platforms: PlatformsFile = read_file(&dir.join(PLATFORMS_FILE))?;
        let locales: LocalesFile = read_file(&dir.join(LOCALES_FILE))?;
        let registry = Self::new(Vocabulary {
            categories: categories.categories,
            aliases: categories.aliases,
            formats: formats.formats,
            platforms: platforms.platforms,
            locales: locales.locales,
        })?;
        tracing::debug!(
            categories = registry.categories.len(),
            aliases = registry.aliases.len(),
            formats = registry.formats.len(),
            platforms = registry.platforms.len(),
            locales = registry.locales.len(),
            "Loaded schema registry"
        );
        Ok(registry)
    }

    /// Maps an alias to its canonical category; anything else is returned unchanged.
    ///
    /// Canonical values are fixed points.
    pub fn normalize_category<'a>(&'a self, input: &'a str) -> &'a str {
        if self.categories.contains(input) {
            return input;
        }
        self.aliases.get(input).map(String::as_str).unwrap_or(input)
    }

    /// Accepts canonical categories and aliases.
    pub fn is_valid_category(&self, input: &str) -> bool {
        self.categories.contains(input) || self.aliases.contains_key(input)
    }

    pub fn is_valid_format(&self, input: &str) -> bool {
        self.formats.contains(input)
    }

    pub fn is_valid_platform(&self, input: &str) -> bool {
        self.platforms.contains(input)
    }

    pub fn is_valid_locale(&self, input: &str) -> bool {
        self.locales.contains_key(input)
    }

    pub fn locale(&self, code: &str) -> Option<&Locale> {
        self.locales.get(code)
    }

    /// Canonical categories, sorted.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }

    /// Alias → canonical pairs, sorted by alias.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.formats.iter().map(String::as_str)
    }

    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.platforms.iter().map(String::as_str)
    }

    /// Locale codes, sorted.
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.locales.keys().map(String::as_str)
    }
}

fn read_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
    serde_yaml::from_str(&text).or_raise(|| ErrorKind::Malformed(path.to_path_buf()))
}
