//! Run configuration for gearbase.
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults,
//! 2. the user's config file (`gearbase.toml` in the platform config directory),
//! 3. `gearbase.toml`, then `gearbase.yaml`, in the project directory,
//! 4. `GEARBASE_*` environment variables (`__` separates nested keys).
//!
//! Relative paths are resolved against the project directory.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::instrument;

pub const CONFIG_FILE_STEM: &str = "gearbase";
pub const ENV_PREFIX: &str = "GEARBASE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root of the record dataset.
    pub dataset: PathBuf,
    /// Directory holding the vocabulary files.
    pub schema: PathBuf,
    /// SQLite store produced by the materializer.
    pub store: PathBuf,
    /// Directory incremental patch files are written to.
    pub patches: PathBuf,
    /// Report records without an id as errors.
    pub require_ids: bool,
    /// Version string stamped into the store's metadata.
    pub dataset_version: Option<String>,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data"),
            schema: PathBuf::from("schema"),
            store: PathBuf::from("gearbase.sqlite"),
            patches: PathBuf::from("patches"),
            require_ids: false,
            dataset_version: None,
        }
    }
}

impl Config {
    /// Loads the layered configuration for a project directory.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(user) = Self::user_config_file() {
            tracing::trace!(path = %user.display(), "Merging user configuration");
            figment = figment.merge(Toml::file(user));
        }
        let figment = figment.merge(Self::project_figment(dir));
        Self::extract(figment, dir)
    }

    /// Project-level sources only: config files in `dir`, then the environment.
    pub fn project_figment(dir: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(dir.join(format!("{CONFIG_FILE_STEM}.toml"))))
            .merge(Yaml::file(dir.join(format!("{CONFIG_FILE_STEM}.yaml"))))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extracts settings from an arbitrary figment, resolving relative paths
    /// against `base`.
    pub fn extract(figment: Figment, base: &Path) -> Result<Self> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(figment)
            .extract()
            .map_err(|e| ErrorKind::Load(e.to_string()))?;
        config.check()?;
        let config = config.resolve(base);
        tracing::debug!(
            dataset = %config.dataset.display(),
            schema = %config.schema.display(),
            store = %config.store.display(),
            require_ids = config.require_ids,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// `gearbase.toml` in the platform's per-user config directory.
    pub fn user_config_file() -> Option<PathBuf> {
        ProjectDirs::from("", "", CONFIG_FILE_STEM)
            .map(|dirs| dirs.config_dir().join(format!("{CONFIG_FILE_STEM}.toml")))
            .filter(|path| path.is_file())
    }

    fn check(&self) -> Result<()> {
        if self.dataset_version.as_deref().is_some_and(|v| v.trim().is_empty()) {
            exn::bail!(ErrorKind::Invalid { key: "dataset_version", reason: "must not be empty" });
        }
        for (key, path) in [("dataset", &self.dataset), ("schema", &self.schema), ("store", &self.store)] {
            if path.as_os_str().is_empty() {
                exn::bail!(ErrorKind::Invalid { key, reason: "path must not be empty" });
            }
        }
        Ok(())
    }

    fn resolve(self, base: &Path) -> Self {
        let resolve = |path: PathBuf| if path.is_relative() { base.join(path) } else { path };
        Self {
            dataset: resolve(self.dataset),
            schema: resolve(self.schema),
            store: resolve(self.store),
            patches: resolve(self.patches),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_resolve_against_project_dir() {
        let config = Config::extract(Figment::new(), Path::new("/srv/gear")).unwrap();
        assert_eq!(config.dataset, Path::new("/srv/gear/data"));
        assert_eq!(config.store, Path::new("/srv/gear/gearbase.sqlite"));
        assert!(!config.require_ids);
        assert_eq!(config.dataset_version, None);
    }

    #[test]
    fn test_files_then_environment() {
        Jail::expect_with(|jail| {
            jail.create_file("gearbase.toml", "dataset = \"records\"\nrequire_ids = true\n")?;
            jail.create_file("gearbase.yaml", "store: /var/lib/gear.sqlite\ndataset_version: '2026.10'\n")?;
            jail.set_env("GEARBASE_DATASET_VERSION", "v2026.11");
            let dir = jail.directory().to_path_buf();
            let config = Config::extract(Config::project_figment(&dir), &dir).unwrap();
            assert_eq!(config.dataset, dir.join("records"));
            assert_eq!(config.store, Path::new("/var/lib/gear.sqlite"));
            assert!(config.require_ids);
            assert_eq!(config.dataset_version.as_deref(), Some("v2026.11"));
            Ok(())
        });
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("gearbase.toml", "datasets = \"typo\"\n")?;
            let dir = jail.directory().to_path_buf();
            let err = Config::extract(Config::project_figment(&dir), &dir).unwrap_err();
            assert!(matches!(*err, ErrorKind::Load(_)));
            Ok(())
        });
    }

    #[test]
    fn test_empty_dataset_version_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("gearbase.toml", "dataset_version = \"  \"\n")?;
            let dir = jail.directory().to_path_buf();
            let err = Config::extract(Config::project_figment(&dir), &dir).unwrap_err();
            assert_eq!(*err, ErrorKind::Invalid { key: "dataset_version", reason: "must not be empty" });
            Ok(())
        });
    }
}
