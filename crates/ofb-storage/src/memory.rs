use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::traits::DurableStorage;

/// In-memory, `BTreeMap`-based durable storage.
///
/// Intended for tests and embedding. Entries are held behind a `RwLock`.
/// With [`InMemoryStorage::with_quota`] the store behaves like a capacity
/// limited medium: a `set` that would push the total of key and value bytes
/// past the quota fails with [`StorageError::QuotaExceeded`].
pub struct InMemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl InMemoryStorage {
    /// Create a new empty store without a quota.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            quota: None,
        }
    }

    /// Create a new empty store that holds at most `bytes` of keys and values.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            quota: Some(bytes),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes of keys and values, as counted against the quota.
    pub fn used_bytes(&self) -> usize {
        usage(&self.entries.read().expect("lock poisoned"))
    }

    /// A sorted copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().expect("lock poisoned").clone()
    }
}

fn usage(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl DurableStorage for InMemoryStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().expect("lock poisoned");
        if let Some(limit) = self.quota {
            let replaced = entries.get(key).map_or(0, |old| key.len() + old.len());
            let required = usage(&entries) - replaced + key.len() + value.len();
            if required > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    required,
                    limit,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().expect("lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        let mut entries = self.entries.write().expect("lock poisoned");
        Ok(entries.remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let entries = self.entries.read().expect("lock poisoned");
        Ok(entries.keys().cloned().collect())
    }

    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let entries = self.entries.read().expect("lock poisoned");
        Ok(entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStorage")
            .field("entry_count", &self.len())
            .field("quota", &self.quota)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn set_and_get() {
        let storage = InMemoryStorage::new();
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn set_overwrites() {
        let storage = InMemoryStorage::new();
        storage.set("k", "1").unwrap();
        storage.set("k", "2").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("2"));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn get_missing_returns_none() {
        let storage = InMemoryStorage::new();
        assert!(storage.get("missing").unwrap().is_none());
    }

    #[test]
    fn remove_reports_presence() {
        let storage = InMemoryStorage::new();
        storage.set("k", "v").unwrap();
        assert!(storage.remove("k").unwrap());
        assert!(!storage.remove("k").unwrap());
        assert!(storage.is_empty());
    }

    // -----------------------------------------------------------------------
    // Prefix operations
    // -----------------------------------------------------------------------

    #[test]
    fn keys_with_prefix_is_sorted_and_bounded() {
        let storage = InMemoryStorage::new();
        for key in ["ofb_b", "other", "ofb_a", "ofc", "ofb_"] {
            storage.set(key, "1").unwrap();
        }
        assert_eq!(
            storage.keys_with_prefix("ofb_").unwrap(),
            vec!["ofb_", "ofb_a", "ofb_b"]
        );
    }

    #[test]
    fn remove_prefix_leaves_other_keys() {
        let storage = InMemoryStorage::new();
        storage.set("ofb_a", "1").unwrap();
        storage.set("ofb_b", "1").unwrap();
        storage.set("foreign", "1").unwrap();
        assert_eq!(storage.remove_prefix("ofb_").unwrap(), 2);
        assert_eq!(storage.keys().unwrap(), vec!["foreign"]);
    }

    // -----------------------------------------------------------------------
    // Quota
    // -----------------------------------------------------------------------

    #[test]
    fn quota_rejects_oversized_write() {
        let storage = InMemoryStorage::with_quota(10);
        storage.set("abc", "defg").unwrap(); // 7 bytes
        let err = storage.set("hij", "kl").unwrap_err(); // would be 12
        assert!(matches!(
            err,
            StorageError::QuotaExceeded { required: 12, limit: 10, .. }
        ));
        assert!(storage.get("hij").unwrap().is_none());
        assert_eq!(storage.used_bytes(), 7);
    }

    #[test]
    fn quota_counts_replacement_not_addition() {
        let storage = InMemoryStorage::with_quota(8);
        storage.set("key", "12345").unwrap(); // 8 bytes
        storage.set("key", "54321").unwrap(); // still 8 bytes
        assert_eq!(storage.get("key").unwrap().as_deref(), Some("54321"));
    }

    #[test]
    fn debug_format() {
        let storage = InMemoryStorage::new();
        storage.set("x", "y").unwrap();
        let debug = format!("{storage:?}");
        assert!(debug.contains("InMemoryStorage"));
        assert!(debug.contains("entry_count"));
    }
}
