//! Atomic TOML file operations.
//!
//! Every write goes to a sibling temp file, is fsynced, then renamed over the
//! target, so a crash leaves either the old document or the new one on disk.

use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;

use peak_core::PeakError;

/// Errors that can occur during atomic TOML operations.
#[derive(Debug, Error)]
pub enum AtomicTomlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Lock error: {0}")]
    Lock(String),
    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
}

impl From<AtomicTomlError> for PeakError {
    fn from(err: AtomicTomlError) -> Self {
        match err {
            AtomicTomlError::Parse(e) => e.into(),
            AtomicTomlError::Serialize(e) => e.into(),
            other => PeakError::storage(other.to_string()),
        }
    }
}

/// A handle to a TOML document stored with atomic replace semantics.
///
/// `load` tolerates a missing or empty file. `update` holds an exclusive
/// advisory lock for the whole read-modify-write.
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for AtomicTomlFile<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and parses the document.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: Parsed document
    /// - `Ok(None)`: File is missing or blank
    /// - `Err`: Read or parse failure
    pub fn load(&self) -> Result<Option<T>, AtomicTomlError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(toml::from_str(&content)?))
    }

    /// Replaces the document on disk.
    pub fn save(&self, data: &T) -> Result<(), AtomicTomlError> {
        let parent = self.parent_dir()?;
        fs::create_dir_all(parent)?;

        let serialized = toml::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        {
            let mut tmp = create_private(&tmp_path)?;
            tmp.write_all(serialized.as_bytes())?;
            tmp.sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Locked read-modify-write. `seed` is used when the file does not exist.
    pub fn update<F>(&self, seed: T, f: F) -> Result<(), AtomicTomlError>
    where
        F: FnOnce(&mut T),
    {
        let _lock = FileLock::acquire(&self.path)?;
        let mut data = self.load()?.unwrap_or(seed);
        f(&mut data);
        self.save(&data)
    }

    fn parent_dir(&self) -> Result<&Path, AtomicTomlError> {
        self.path
            .parent()
            .ok_or_else(|| AtomicTomlError::InvalidPath(self.path.clone()))
    }

    fn temp_path(&self) -> Result<PathBuf, AtomicTomlError> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| AtomicTomlError::InvalidPath(self.path.clone()))?;
        Ok(self
            .parent_dir()?
            .join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

/// Opens the temp file owner-only before any content is written.
/// Session files hold bearer tokens.
#[cfg(unix)]
fn create_private(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; a leftover temp file keeps its own.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_private(path: &Path) -> std::io::Result<File> {
    File::create(path)
}

/// Exclusive advisory lock on `<path>.lock`, released on drop.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicTomlError> {
        use fs2::FileExt;

        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        file.lock_exclusive()
            .map_err(|e| AtomicTomlError::Lock(format!("{}: {}", lock_path.display(), e)))?;

        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        use fs2::FileExt;
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
    struct Counter {
        count: u32,
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("missing.toml"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_blank_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blank.toml");
        fs::write(&path, "  \n").unwrap();

        let file = AtomicTomlFile::<Counter>::new(path);
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_update_seeds_then_accumulates() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("nested/counter.toml"));

        file.update(Counter::default(), |c| c.count += 10).unwrap();
        file.update(Counter::default(), |c| c.count += 5).unwrap();

        assert_eq!(file.load().unwrap(), Some(Counter { count: 15 }));
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter.toml");
        let file = AtomicTomlFile::<Counter>::new(path.clone());

        file.save(&Counter { count: 1 }).unwrap();

        assert!(path.exists());
        assert!(!temp_dir.path().join(".counter.toml.tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter.toml");
        fs::write(&path, "count = [not toml").unwrap();

        let file = AtomicTomlFile::<Counter>::new(path);
        assert!(matches!(file.load(), Err(AtomicTomlError::Parse(_))));
    }

    #[test]
    fn test_clone_points_at_same_document() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("counter.toml"));
        let copy = file.clone();

        file.save(&Counter { count: 7 }).unwrap();

        assert_eq!(copy.path(), file.path());
        assert_eq!(copy.load().unwrap(), Some(Counter { count: 7 }));
    }

    #[cfg(unix)]
    #[test]
    fn test_leftover_temp_file_is_made_private_before_write() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.toml");
        let leftover = temp_dir.path().join(".session.toml.tmp");
        fs::write(&leftover, "stale").unwrap();
        fs::set_permissions(&leftover, fs::Permissions::from_mode(0o644)).unwrap();

        let file = AtomicTomlFile::<Counter>::new(path.clone());
        file.save(&Counter { count: 1 }).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
