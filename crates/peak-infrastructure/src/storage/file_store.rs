//! File-backed key-value store.

use super::atomic_toml::AtomicTomlFile;
use async_trait::async_trait;
use peak_core::storage::KeyValueStore;
use peak_core::{PeakError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
struct KeyValueDocument {
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Key-value store persisted as a single TOML document.
///
/// Each `set`/`remove` is a locked read-modify-write followed by an atomic
/// rename, so a value is either fully on disk or not at all. Blocking file
/// I/O runs on the tokio blocking pool.
#[derive(Clone)]
pub struct FileKeyValueStore {
    file: AtomicTomlFile<KeyValueDocument>,
}

impl FileKeyValueStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }

    async fn blocking<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(AtomicTomlFile<KeyValueDocument>) -> Result<R> + Send + 'static,
    {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || f(file))
            .await
            .map_err(|e| PeakError::internal(format!("storage task failed: {}", e)))?
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.blocking(move |file| {
            let document = file.load()?.unwrap_or_default();
            Ok(document.entries.get(&key).cloned())
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.blocking(move |file| {
            file.update(KeyValueDocument::default(), |document| {
                document.entries.insert(key, value);
            })?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |file| {
            file.update(KeyValueDocument::default(), |document| {
                document.entries.remove(&key);
            })?;
            Ok(())
        })
        .await
    }
}
