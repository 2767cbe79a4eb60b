use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use exn::ResultExt;
use gearbase_records::Collection;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Name of the slug index file at the dataset root.
pub const SLUG_INDEX_FILE: &str = "slugs.json";
/// Name of the id migration mapping file at the dataset root.
pub const ID_MIGRATION_FILE: &str = "id-migration.json";
/// Accepted record file extensions, in lookup order.
pub const RECORD_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// A record file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordFile {
    pub collection: Collection,
    /// File stem; authoritative for the record's slug.
    pub slug: String,
    /// Absolute path to the file.
    pub path: PathBuf,
}

/// A dataset directory: one subdirectory per collection, one YAML file per record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    root: PathBuf,
}
impl Dataset {
    /// Opens an existing dataset directory.
    ///
    /// Collection directories are optional; a missing one is an empty collection.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection_dir(&self, collection: Collection) -> PathBuf {
        self.root.join(collection.as_str())
    }

    pub fn slug_index_path(&self) -> PathBuf {
        self.root.join(SLUG_INDEX_FILE)
    }

    pub fn migration_path(&self) -> PathBuf {
        self.root.join(ID_MIGRATION_FILE)
    }

    /// Lists the record files of one collection, sorted by slug.
    #[instrument(level = "debug", skip(self))]
    pub fn record_files(&self, collection: Collection) -> Result<Vec<RecordFile>> {
        let dir = self.collection_dir(collection);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err).or_raise(|| ErrorKind::Io(dir)),
        };
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.or_raise(|| ErrorKind::Io(dir.clone()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(slug) = record_stem(&path) else {
                tracing::trace!(path = %path.display(), "Ignoring non-record file");
                continue;
            };
            files.push(RecordFile { collection, slug: slug.to_string(), path });
        }
        files.sort();
        Ok(files)
    }

    /// Lists every record file, collections in dependency order.
    pub fn all_record_files(&self) -> Result<Vec<RecordFile>> {
        let mut files = Vec::new();
        for collection in Collection::ALL {
            files.extend(self.record_files(collection)?);
        }
        Ok(files)
    }

    /// Finds the file for a slug, trying each accepted extension in turn.
    pub fn find(&self, collection: Collection, slug: &str) -> Option<RecordFile> {
        let dir = self.collection_dir(collection);
        RECORD_EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{slug}.{ext}")))
            .find(|path| path.is_file())
            .map(|path| RecordFile { collection, slug: slug.to_string(), path })
    }

    /// Path a new record would be written to.
    pub fn new_record_path(&self, collection: Collection, slug: &str) -> PathBuf {
        self.collection_dir(collection).join(format!("{slug}.{}", RECORD_EXTENSIONS[0]))
    }

    pub fn read(&self, file: &RecordFile) -> Result<String> {
        fs::read_to_string(&file.path).or_raise(|| ErrorKind::Io(file.path.clone()))
    }

    pub fn write(&self, file: &RecordFile, contents: &str) -> Result<()> {
        fs::write(&file.path, contents).or_raise(|| ErrorKind::Io(file.path.clone()))
    }

    /// Path of a record file relative to the dataset root.
    pub fn relative<'a>(&self, file: &'a RecordFile) -> &'a Path {
        file.path.strip_prefix(&self.root).unwrap_or(&file.path)
    }

    /// Maps a path relative to the dataset root back to `(collection, slug)`.
    ///
    /// Returns `None` for anything that is not a record file directly inside a
    /// collection directory.
    pub fn locate(&self, relative: impl AsRef<Path>) -> Result<Option<(Collection, String)>> {
        let relative = validate_path(relative)?;
        let mut components = relative.components();
        let (Some(dir), Some(file), None) = (components.next(), components.next(), components.next()) else {
            return Ok(None);
        };
        let Some(collection) = dir.as_os_str().to_str().and_then(|d| d.parse::<Collection>().ok()) else {
            return Ok(None);
        };
        if dir.as_os_str() != collection.as_str() {
            return Ok(None);
        }
        Ok(record_stem(Path::new(file.as_os_str())).map(|slug| (collection, slug.to_string())))
    }
}

/// Returns the slug for a record file name, or `None` if the file is not a record.
fn record_stem(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    if name.starts_with('.') || name.starts_with('_') {
        return None;
    }
    let extension = path.extension()?.to_str()?;
    if !RECORD_EXTENSIONS.contains(&extension) {
        return None;
    }
    path.file_stem()?.to_str()
}
