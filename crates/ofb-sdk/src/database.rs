use std::sync::Arc;

use ofb_cache::{CacheConfig, CacheError, OfflineCache, RestoreReport};
use ofb_remote::RemoteStore;
use ofb_storage::DurableStorage;
use ofb_types::Path;
use tracing::info;

use crate::error::SdkResult;
use crate::reference::OfflineRef;

/// Receives cache failures raised inside subscription callbacks, where they
/// cannot be returned to a caller.
pub type ErrorHandler = Arc<dyn Fn(&Path, &CacheError) + Send + Sync>;

/// A remote tree database with an offline cache attached.
///
/// Cloning is cheap: clones share the remote client and the cache.
pub struct OfflineDatabase<R, S> {
    remote: Arc<R>,
    cache: Arc<OfflineCache<S>>,
    on_error: Option<ErrorHandler>,
}

impl<R, S> OfflineDatabase<R, S>
where
    R: RemoteStore,
    S: DurableStorage + 'static,
{
    /// Decorate `remote`, caching into `storage` under the default namespace.
    pub fn new(remote: Arc<R>, storage: S) -> Self {
        Self::with_cache(remote, OfflineCache::new(storage))
    }

    /// Decorate `remote` with a cache built from `config`.
    pub fn with_config(remote: Arc<R>, storage: S, config: CacheConfig) -> SdkResult<Self> {
        Ok(Self::with_cache(remote, OfflineCache::with_config(storage, config)?))
    }

    pub fn with_cache(remote: Arc<R>, cache: OfflineCache<S>) -> Self {
        Self {
            remote,
            cache: Arc::new(cache),
            on_error: None,
        }
    }

    /// Install a handler for cache failures inside caching callbacks.
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Path, &CacheError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub fn cache(&self) -> &OfflineCache<S> {
        &self.cache
    }

    pub(crate) fn cache_handle(&self) -> &Arc<OfflineCache<S>> {
        &self.cache
    }

    pub(crate) fn error_handler(&self) -> Option<&ErrorHandler> {
        self.on_error.as_ref()
    }

    /// A reference to `path`.
    pub fn reference(&self, path: impl Into<Path>) -> OfflineRef<R, S> {
        OfflineRef::new(self.clone(), path.into())
    }

    /// A reference to the database root.
    pub fn root(&self) -> OfflineRef<R, S> {
        self.reference(Path::root())
    }

    /// Write every cached tree back into the remote client.
    ///
    /// Meant for cold starts, before the client has reached the server.
    pub fn restore(&self) -> SdkResult<RestoreReport> {
        let report = self.cache.restore_all(self.remote.as_ref())?;
        Ok(report)
    }

    /// Delete everything this database has cached. Returns the number of
    /// entries removed.
    pub fn clear(&self) -> SdkResult<usize> {
        let removed = self.cache.clear_all()?;
        info!(removed, "offline database cleared");
        Ok(removed)
    }
}

impl<R, S> Clone for OfflineDatabase<R, S> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            cache: Arc::clone(&self.cache),
            on_error: self.on_error.clone(),
        }
    }
}

impl<R, S> std::fmt::Debug for OfflineDatabase<R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineDatabase")
            .field("namespace", &self.cache.config().namespace)
            .field("error_handler", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofb_remote::{EventType, InMemoryRemoteStore};
    use ofb_storage::{InMemoryStorage, JsonFileStorage};
    use ofb_types::TreeValue;

    fn scenario() -> TreeValue {
        TreeValue::node()
            .with_priority(5)
            .with_child("a", TreeValue::leaf(1))
            .with_child(
                "b",
                TreeValue::node().with_priority(2).with_child("c", TreeValue::leaf(3)),
            )
    }

    #[test]
    fn cold_start_restores_what_the_last_session_saw() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("offline.json");

        {
            let online = Arc::new(InMemoryRemoteStore::with_data(
                TreeValue::node().with_child("x", scenario()),
            ));
            let db = OfflineDatabase::new(online, JsonFileStorage::open(&file).unwrap());
            db.reference("/x").on(EventType::Value, |_| {}, true).unwrap();
        }

        let offline = Arc::new(InMemoryRemoteStore::new());
        let db = OfflineDatabase::new(Arc::clone(&offline), JsonFileStorage::open(&file).unwrap());
        let report = db.restore().unwrap();

        assert_eq!(report.roots, vec![Path::parse("/x")]);
        assert_eq!(offline.value(&Path::parse("/x")), Some(scenario()));
        assert_eq!(offline.synced_paths(), vec![Path::parse("/x")]);
    }

    #[test]
    fn restore_with_live_caching_subscription() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let db = OfflineDatabase::new(Arc::clone(&remote), InMemoryStorage::new());
        db.cache().store(&Path::parse("/x"), Some(&scenario())).unwrap();
        // Fires at once with no data, which must not erase the cached tree.
        db.reference("/x").on(EventType::Value, |_| {}, true).unwrap();
        db.restore().unwrap();

        assert_eq!(remote.value(&Path::parse("/x")), Some(scenario()));
        assert_eq!(db.cache().reconstitute(&Path::parse("/x")).unwrap(), Some(scenario()));
    }

    #[test]
    fn clear_removes_only_cache_entries() {
        let storage = InMemoryStorage::new();
        storage.set("session", "abc").unwrap();
        let remote = Arc::new(InMemoryRemoteStore::with_data(
            TreeValue::node().with_child("x", TreeValue::leaf(1)),
        ));
        let db = OfflineDatabase::new(remote, storage);
        db.reference("/x").on(EventType::Value, |_| {}, true).unwrap();

        assert_eq!(db.clear().unwrap(), 2);
        assert_eq!(db.cache().storage().keys().unwrap(), vec!["session"]);
    }

    #[test]
    fn custom_namespace_is_validated() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let bad = OfflineDatabase::with_config(
            remote,
            InMemoryStorage::new(),
            CacheConfig::with_namespace("a/b"),
        );
        assert!(bad.is_err());
    }

    #[test]
    fn debug_shows_namespace() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let db = OfflineDatabase::new(remote, InMemoryStorage::new()).with_error_handler(|_, _| {});
        let rendered = format!("{db:?}");
        assert!(rendered.contains("\"ofb_\""));
        assert!(rendered.contains("error_handler: true"));
    }

    #[test]
    fn clones_share_the_cache() {
        let remote = Arc::new(InMemoryRemoteStore::with_data(
            TreeValue::node().with_child("x", TreeValue::leaf(1)),
        ));
        let db = OfflineDatabase::new(remote, InMemoryStorage::new());
        let other = db.clone();
        other.reference("/x").on(EventType::Value, |_| {}, true).unwrap();
        assert_eq!(db.cache().roots().unwrap(), vec![Path::parse("/x")]);
    }
}
