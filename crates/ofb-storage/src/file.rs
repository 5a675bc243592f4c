//! File-backed durable storage.
//!
//! [`JsonFileStorage`] keeps the whole key space in one JSON object on disk.
//! The file is read once at open; every mutation writes a complete new copy
//! to a temporary file in the same directory and renames it over the old one,
//! so readers never observe a torn file.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::traits::DurableStorage;

/// Durable storage persisted as a single JSON file.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStorage {
    /// Open the store at `path`, creating an empty one if the file does not
    /// exist yet. The file itself is only created on the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), entries = entries.len(), "opened file storage");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutate` to a copy of the entries, persist the copy, then make
    /// it current. On failure the in-memory state is unchanged.
    ///
    /// Every call clones the map and rewrites the whole file, so n separate
    /// `set` calls cost O(n²) bytes of I/O. Use `set_many` or `remove_prefix`
    /// to batch.
    fn mutate<T>(
        &self,
        mutate: impl FnOnce(&mut BTreeMap<String, String>) -> T,
    ) -> StorageResult<T> {
        let mut entries = self.entries.write().expect("lock poisoned");
        let mut next = entries.clone();
        let out = mutate(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(out)
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let json = serde_json::to_vec(entries)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }
}

impl DurableStorage for JsonFileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn set_many(&self, batch: &[(String, String)]) -> StorageResult<()> {
        self.mutate(|entries| {
            for (key, value) in batch {
                entries.insert(key.clone(), value.clone());
            }
        })
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().expect("lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        if !self.entries.read().expect("lock poisoned").contains_key(key) {
            return Ok(false);
        }
        self.mutate(|entries| entries.remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let entries = self.entries.read().expect("lock poisoned");
        Ok(entries.keys().cloned().collect())
    }

    fn remove_prefix(&self, prefix: &str) -> StorageResult<usize> {
        self.mutate(|entries| {
            let before = entries.len();
            entries.retain(|key, _| !key.starts_with(prefix));
            before - entries.len()
        })
    }
}
