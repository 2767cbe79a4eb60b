//! Prior dataset revisions to diff against.
//!
//! Patch generation and the id immutability check both need to know which
//! records changed since some earlier state, and what those records looked
//! like back then. A [`Baseline`] answers both questions.

use crate::dataset::{Dataset, RecordFile};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use gearbase_records::Collection;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}
impl Display for ChangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        })
    }
}

/// A record file that differs between the baseline and the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Change {
    pub collection: Collection,
    pub slug: String,
    pub kind: ChangeKind,
}

pub trait Baseline {
    /// Record changes from the baseline to the dataset, sorted by collection
    /// (dependency order) then slug.
    fn changes(&self, dataset: &Dataset) -> Result<Vec<Change>>;

    /// Contents of a record as of the baseline; `None` if it did not exist.
    fn read(&self, collection: Collection, slug: &str) -> Result<Option<String>>;
}

/// A git revision of the repository containing the dataset.
///
/// Compares the working tree's tracked files against `rev`.
#[derive(Debug, Clone)]
pub struct GitBaseline {
    git: PathBuf,
    root: PathBuf,
    rev: String,
}
impl GitBaseline {
    pub fn new(dataset: &Dataset, rev: impl Into<String>) -> Result<Self> {
        let git = which::which("git").or_raise(|| ErrorKind::GitNotFound)?;
        tracing::trace!(git = %git.display(), "Discovered git executable");
        Ok(Self { git, root: dataset.root().to_path_buf(), rev: rev.into() })
    }

    pub fn rev(&self) -> &str {
        &self.rev
    }

    /// Untracked, non-ignored files under the collection directories,
    /// relative to the dataset root.
    fn untracked(&self) -> Result<Vec<String>> {
        let mut args = vec!["ls-files", "--others", "--exclude-standard", "-z", "--"];
        args.extend(Collection::ALL.iter().map(Collection::as_str));
        let output = self.run(&args)?;
        if !output.status.success() {
            exn::bail!(ErrorKind::Git(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .split('\0')
            .filter(|path| !path.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        Command::new(&self.git)
            .args(args)
            .current_dir(&self.root)
            .output()
            .or_raise(|| ErrorKind::Git(format!("could not run {}", self.git.display())))
    }
}
impl Baseline for GitBaseline {
    #[instrument(skip_all, fields(rev = %self.rev))]
    fn changes(&self, dataset: &Dataset) -> Result<Vec<Change>> {
        let mut args: Vec<&str> = vec!["diff", "--name-status", "--no-renames", "--relative", self.rev.as_str(), "--"];
        args.extend(Collection::ALL.iter().map(|c| -> &str { c.as_str() }));
        let output = self.run(&args)?;
        if !output.status.success() {
            exn::bail!(ErrorKind::Git(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut kinds = BTreeMap::new();
        for line in stdout.lines() {
            let Some((status, path)) = line.split_once('\t') else {
                continue;
            };
            let Some(key) = dataset.locate(path)? else {
                continue;
            };
            let kind = match status.chars().next() {
                Some('A') => ChangeKind::Added,
                Some('D') => ChangeKind::Deleted,
                _ => ChangeKind::Modified,
            };
            kinds.insert(key, kind);
        }

        // `git diff` only sees tracked files; new records may not be staged yet.
        for path in self.untracked()? {
            let Some(key) = dataset.locate(&path)? else {
                continue;
            };
            kinds
                .entry(key)
                .and_modify(|kind| {
                    if *kind == ChangeKind::Deleted {
                        *kind = ChangeKind::Modified;
                    }
                })
                .or_insert(ChangeKind::Added);
        }

        let changes: Vec<Change> =
            kinds.into_iter().map(|((collection, slug), kind)| Change { collection, slug, kind }).collect();
        tracing::debug!(changes = changes.len(), "Computed changes against git revision");
        Ok(changes)
    }

    fn read(&self, collection: Collection, slug: &str) -> Result<Option<String>> {
        for extension in crate::dataset::RECORD_EXTENSIONS {
            let spec = format!("{}:./{}/{slug}.{extension}", self.rev, collection.as_str());
            let output = self.run(&["show", &spec])?;
            if output.status.success() {
                return Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()));
            }
        }
        Ok(None)
    }
}

/// A snapshot copy of the dataset directory, compared by content hash.
#[derive(Debug, Clone)]
pub struct DirectoryBaseline {
    snapshot: Dataset,
}
impl DirectoryBaseline {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self { snapshot: Dataset::open(root)? })
    }

    fn hashes(dataset: &Dataset) -> Result<BTreeMap<(Collection, String), blake3::Hash>> {
        let mut hashes = BTreeMap::new();
        for RecordFile { collection, slug, path } in dataset.all_record_files()? {
            let bytes = fs::read(&path).or_raise(|| ErrorKind::Io(path.clone()))?;
            hashes.insert((collection, slug), blake3::hash(&bytes));
        }
        Ok(hashes)
    }
}
impl Baseline for DirectoryBaseline {
    #[instrument(skip_all, fields(snapshot = %self.snapshot.root().display()))]
    fn changes(&self, dataset: &Dataset) -> Result<Vec<Change>> {
        let before = Self::hashes(&self.snapshot)?;
        let after = Self::hashes(dataset)?;
        let mut changes = Vec::new();
        for ((collection, slug), hash) in &after {
            let kind = match before.get(&(*collection, slug.clone())) {
                None => ChangeKind::Added,
                Some(old) if old != hash => ChangeKind::Modified,
                Some(_) => continue,
            };
            changes.push(Change { collection: *collection, slug: slug.clone(), kind });
        }
        for (collection, slug) in before.keys() {
            if !after.contains_key(&(*collection, slug.clone())) {
                changes.push(Change { collection: *collection, slug: slug.clone(), kind: ChangeKind::Deleted });
            }
        }
        changes.sort();
        tracing::debug!(changes = changes.len(), "Computed changes against snapshot");
        Ok(changes)
    }

    fn read(&self, collection: Collection, slug: &str) -> Result<Option<String>> {
        self.snapshot.find(collection, slug).map(|file| self.snapshot.read(&file)).transpose()
    }
}
