use crate::dataset::Dataset;
use crate::error::{ErrorKind, Result, SlugConflict};
use exn::ResultExt;
use gearbase_records::Collection;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Global `slug → collection` map.
///
/// Slugs are unique across all three collections. The on-disk form is a
/// pretty-printed JSON object sorted by slug, regenerated wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlugIndex {
    entries: BTreeMap<String, Collection>,
}

/// Result of scanning a dataset without failing on conflicts.
#[derive(Debug, Clone, Default)]
pub struct SlugScan {
    /// First claimant wins, in collection dependency order.
    pub index: SlugIndex,
    pub conflicts: Vec<SlugConflict>,
}

impl SlugIndex {
    /// Scans every record file, collecting conflicts instead of failing on them.
    #[instrument(skip_all, fields(root = %dataset.root().display()))]
    pub fn scan(dataset: &Dataset) -> Result<SlugScan> {
        let mut claims: BTreeMap<String, Vec<(Collection, PathBuf)>> = BTreeMap::new();
        for file in dataset.all_record_files()? {
            let relative = dataset.relative(&file).to_path_buf();
            claims.entry(file.slug).or_default().push((file.collection, relative));
        }
        let mut scan = SlugScan::default();
        for (slug, claimants) in claims {
            if claimants.len() > 1 {
                let paths = claimants.iter().map(|(_, p)| p.clone()).collect();
                scan.conflicts.push(SlugConflict { slug: slug.clone(), paths });
            }
            scan.index.entries.insert(slug, claimants[0].0);
        }
        tracing::debug!(slugs = scan.index.len(), conflicts = scan.conflicts.len(), "Scanned dataset slugs");
        Ok(scan)
    }

    /// Rebuilds the index from the dataset.
    ///
    /// Fails with [`ErrorKind::SlugConflict`] listing every slug that appears
    /// in more than one location.
    pub fn rebuild(dataset: &Dataset) -> Result<Self> {
        let scan = Self::scan(dataset)?;
        if !scan.conflicts.is_empty() {
            exn::bail!(ErrorKind::SlugConflict(scan.conflicts));
        }
        Ok(scan.index)
    }

    pub fn lookup(&self, slug: &str) -> Option<Collection> {
        self.entries.get(slug).copied()
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.entries.contains_key(slug)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by slug.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Collection)> {
        self.entries.iter().map(|(slug, collection)| (slug.as_str(), *collection))
    }

    /// Slugs belonging to one collection, sorted.
    pub fn slugs_in(&self, collection: Collection) -> impl Iterator<Item = &str> {
        self.iter().filter(move |(_, c)| *c == collection).map(|(slug, _)| slug)
    }

    /// Whether a slug can be taken by a new record.
    ///
    /// `pending` holds the slugs declared by other outstanding proposals; a slug
    /// claimed there is unavailable as well.
    pub fn is_available(&self, slug: &str, pending: &[&str]) -> bool {
        !self.contains(slug) && !pending.contains(&slug)
    }

    /// Registers a new slug.
    pub fn claim(&mut self, slug: impl Into<String>, collection: Collection) -> Result<()> {
        let slug = slug.into();
        if let Some(existing) = self.lookup(&slug) {
            exn::bail!(ErrorKind::SlugTaken { slug, collection: existing });
        }
        self.entries.insert(slug, collection);
        Ok(())
    }

    /// Reads an index file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        let entries = serde_json::from_str(&text).or_raise(|| ErrorKind::MalformedIndex(path.to_path_buf()))?;
        Ok(Self { entries })
    }

    /// Writes the index file, replacing any previous contents.
    #[instrument(skip_all, fields(slugs = self.len()))]
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut json = serde_json::to_string_pretty(&self.entries).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        json.push('\n');
        fs::write(path, json).or_raise(|| ErrorKind::Io(path.to_path_buf()))?;
        tracing::info!(path = %path.display(), "Wrote slug index");
        Ok(())
    }

    /// Whether the committed index file differs from a fresh rebuild.
    ///
    /// A missing file counts as stale.
    pub fn is_stale(dataset: &Dataset) -> Result<bool> {
        let path = dataset.slug_index_path();
        if !path.exists() {
            return Ok(true);
        }
        Ok(Self::load(&path)? != Self::rebuild(dataset)?)
    }
}
