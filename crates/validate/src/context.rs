use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use gearbase_catalog::{Dataset, SlugConflict, SlugIndex, SlugScan};
use gearbase_config::Config;
use gearbase_schema::Registry;
use std::path::PathBuf;
use tracing::instrument;

/// Everything a validation or materialization run reads: the vocabularies, the
/// dataset and its slug index.
///
/// Built once per run. Nothing is cached between runs; call
/// [`Context::reload`] to pick up changes on disk.
#[derive(Debug, Clone)]
pub struct Context {
    registry: Registry,
    dataset: Dataset,
    slugs: SlugScan,
    require_ids: bool,
    dataset_version: Option<String>,
    /// Where the registry came from, when it was loaded from disk.
    schema_dir: Option<PathBuf>,
}

impl Context {
    /// Builds a context from parts already in memory.
    pub fn new(registry: Registry, dataset: Dataset, slugs: SlugScan) -> Self {
        Self { registry, dataset, slugs, require_ids: false, dataset_version: None, schema_dir: None }
    }

    pub fn with_require_ids(mut self, require_ids: bool) -> Self {
        self.require_ids = require_ids;
        self
    }

    pub fn with_dataset_version(mut self, version: impl Into<String>) -> Self {
        self.dataset_version = Some(version.into());
        self
    }

    /// Loads the registry and scans the dataset named by a configuration.
    #[instrument(skip_all, fields(dataset = %config.dataset.display()))]
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = Registry::load(&config.schema).or_raise(|| ErrorKind::Registry)?;
        let dataset = Dataset::open(&config.dataset).or_raise(|| ErrorKind::Dataset)?;
        let slugs = SlugIndex::scan(&dataset).or_raise(|| ErrorKind::Dataset)?;
        tracing::info!(slugs = slugs.index.len(), conflicts = slugs.conflicts.len(), "Prepared run context");
        Ok(Self {
            registry,
            dataset,
            slugs,
            require_ids: config.require_ids,
            dataset_version: config.dataset_version.clone(),
            schema_dir: Some(config.schema.clone()),
        })
    }

    /// Re-reads the registry (when it came from disk) and rescans the dataset.
    #[instrument(skip_all)]
    pub fn reload(&mut self) -> Result<()> {
        if let Some(dir) = &self.schema_dir {
            self.registry = Registry::load(dir).or_raise(|| ErrorKind::Registry)?;
        }
        self.slugs = SlugIndex::scan(&self.dataset).or_raise(|| ErrorKind::Dataset)?;
        tracing::debug!(slugs = self.slugs.index.len(), "Reloaded run context");
        Ok(())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn slugs(&self) -> &SlugIndex {
        &self.slugs.index
    }

    /// Slugs claimed by more than one record file at the last scan.
    pub fn slug_conflicts(&self) -> &[SlugConflict] {
        &self.slugs.conflicts
    }

    pub fn require_ids(&self) -> bool {
        self.require_ids
    }

    /// Version string stamped into materialized stores.
    pub fn dataset_version(&self) -> Option<&str> {
        self.dataset_version.as_deref()
    }
}
