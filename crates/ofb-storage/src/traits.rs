use crate::error::StorageResult;

/// Synchronous string-keyed durable storage.
///
/// All implementations must satisfy these invariants:
/// - `set` overwrites any previous value for the key.
/// - A failed `set` leaves the previous value (or absence) in place.
/// - `keys` reflects every completed `set` and `remove`.
/// - The store never interprets keys or values.
pub trait DurableStorage: Send + Sync {
    /// Store `value` under `key`.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Store every `(key, value)` pair, in order.
    ///
    /// Default implementation calls `set` per pair and stops at the first
    /// failure; pairs already written stay written. Backends where each
    /// `set` is expensive may override with a single write.
    fn set_many(&self, entries: &[(String, String)]) -> StorageResult<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Remove `key`. Returns `true` if it existed.
    fn remove(&self, key: &str) -> StorageResult<bool>;

    /// Every key currently stored, in no particular order.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Every key starting with `prefix`, sorted.
    ///
    /// Default implementation filters `keys()`. Backends with an ordered
    /// index may override.
    fn keys_with_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Remove every key starting with `prefix` and return how many were
    /// removed.
    ///
    /// The key list is collected before any removal, so the enumeration is
    /// never observed mid-mutation.
    fn remove_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let mut removed = 0;
        for key in self.keys_with_prefix(prefix)? {
            if self.remove(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
