use ofb_remote::{RemoteStore, Snapshot};
use ofb_storage::DurableStorage;
use ofb_types::{Path, TreeValue};

use crate::clear::{clear_all, forget};
use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::flatten::{Flattener, StoreReport};
use crate::reconstruct::Reconstructor;
use crate::restore::{restore_all, RestoreReport};

/// An offline cache over one durable storage handle.
///
/// Bundles the storage medium with its [`CacheConfig`] so callers do not
/// thread both through every operation.
#[derive(Debug)]
pub struct OfflineCache<S> {
    storage: S,
    config: CacheConfig,
}

impl<S> OfflineCache<S> {
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl<S: DurableStorage> OfflineCache<S> {
    /// A cache using the default namespace.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            config: CacheConfig::default(),
        }
    }

    /// A cache with an explicit configuration, validated up front.
    pub fn with_config(storage: S, config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self { storage, config })
    }

    /// Persist `value` as the tree at `root`. See [`Flattener::store`].
    pub fn store(&self, root: &Path, value: Option<&TreeValue>) -> CacheResult<StoreReport> {
        Flattener::new(&self.storage, &self.config).store(root, value)
    }

    /// Persist the data of a subscription snapshot at its own path.
    pub fn store_snapshot(&self, snapshot: &Snapshot) -> CacheResult<StoreReport> {
        self.store(&snapshot.path, snapshot.exported.as_ref())
    }

    /// Rebuild the tree stored under `root`.
    pub fn reconstitute(&self, root: &Path) -> CacheResult<Option<TreeValue>> {
        Reconstructor::new(&self.storage, &self.config).reconstitute(root)
    }

    /// Every restorable root.
    pub fn roots(&self) -> CacheResult<Vec<Path>> {
        Reconstructor::new(&self.storage, &self.config).roots()
    }

    /// Re-seed `remote` with everything cached. See [`restore_all`].
    pub fn restore_all<R: RemoteStore + ?Sized>(&self, remote: &R) -> CacheResult<RestoreReport> {
        restore_all(&self.storage, remote, &self.config)
    }

    /// Drop the cached subtree at `root`, restore markers included. See
    /// [`forget`].
    pub fn forget(&self, root: &Path) -> CacheResult<usize> {
        forget(&self.storage, &self.config, root)
    }

    /// Delete every cache entry. See [`clear_all`].
    pub fn clear_all(&self) -> CacheResult<usize> {
        clear_all(&self.storage, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use ofb_remote::InMemoryRemoteStore;
    use ofb_storage::InMemoryStorage;

    #[test]
    fn invalid_config_is_rejected() {
        let err = OfflineCache::with_config(InMemoryStorage::new(), CacheConfig::with_namespace(""))
            .unwrap_err();
        assert!(matches!(err, CacheError::InvalidConfig(_)));
    }

    #[test]
    fn snapshot_is_stored_at_its_path() {
        let cache = OfflineCache::new(InMemoryStorage::new());
        let snapshot = Snapshot::new(Path::parse("/users/alice"), Some(TreeValue::leaf("hi")));
        cache.store_snapshot(&snapshot).unwrap();
        assert_eq!(cache.roots().unwrap(), vec![Path::parse("/users/alice")]);
        assert_eq!(
            cache.reconstitute(&Path::parse("/users/alice")).unwrap(),
            Some(TreeValue::leaf("hi"))
        );
    }

    #[test]
    fn empty_snapshot_stores_nothing() {
        let cache = OfflineCache::new(InMemoryStorage::new());
        cache.store_snapshot(&Snapshot::new(Path::parse("/x"), None)).unwrap();
        assert!(cache.storage().is_empty());
    }

    #[test]
    fn clear_then_restore_is_empty() {
        let cache = OfflineCache::new(InMemoryStorage::new());
        cache.store(&Path::parse("/x"), Some(&TreeValue::leaf(1))).unwrap();
        cache.storage().set("foreign", "kept").unwrap();
        assert_eq!(cache.clear_all().unwrap(), 2);
        assert_eq!(cache.storage().keys().unwrap(), vec!["foreign"]);

        let remote = InMemoryRemoteStore::new();
        let report = cache.restore_all(&remote).unwrap();
        assert!(report.roots.is_empty());
    }
}
