use std::sync::Arc;

use ofb_cache::OfflineCache;
use ofb_remote::{
    CancelCallback, DataCallback, EventType, RemoteError, RemoteStore, Snapshot, SubscriptionId,
};
use ofb_storage::DurableStorage;
use ofb_types::{Path, Primitive, TreeValue};
use serde_json::Value;
use tracing::warn;

use crate::database::{ErrorHandler, OfflineDatabase};
use crate::error::SdkResult;

/// A location in an [`OfflineDatabase`].
///
/// Everything except `cache_offline` subscriptions passes straight through
/// to the remote client.
pub struct OfflineRef<R, S> {
    db: OfflineDatabase<R, S>,
    path: Path,
}

impl<R, S> OfflineRef<R, S>
where
    R: RemoteStore,
    S: DurableStorage + 'static,
{
    pub(crate) fn new(db: OfflineDatabase<R, S>, path: Path) -> Self {
        Self { db, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The last path segment, or `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.path.last()
    }

    pub fn child(&self, name: &str) -> Self {
        let path = self.db.remote().child_path(&self.path, name);
        Self::new(self.db.clone(), path)
    }

    pub fn parent(&self) -> Option<Self> {
        self.path.parent().map(|path| Self::new(self.db.clone(), path))
    }

    pub fn root(&self) -> Self {
        self.db.root()
    }

    /// Subscribe to `event` here. With `cache_offline`, every delivered
    /// snapshot is persisted before `callback` sees it.
    pub fn on<F>(
        &self,
        event: EventType,
        callback: F,
        cache_offline: bool,
    ) -> SdkResult<SubscriptionId>
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.subscribe(event, Arc::new(callback), None, cache_offline, false)
    }

    /// Like [`on`](Self::on), also receiving cancellation from the remote.
    pub fn on_with_cancel<F, C>(
        &self,
        event: EventType,
        callback: F,
        on_cancel: C,
        cache_offline: bool,
    ) -> SdkResult<SubscriptionId>
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
        C: Fn(&RemoteError) + Send + Sync + 'static,
    {
        self.subscribe(event, Arc::new(callback), Some(Arc::new(on_cancel)), cache_offline, false)
    }

    /// Subscribe for the next `event` only.
    pub fn once<F>(
        &self,
        event: EventType,
        callback: F,
        cache_offline: bool,
    ) -> SdkResult<SubscriptionId>
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.subscribe(event, Arc::new(callback), None, cache_offline, true)
    }

    pub fn once_with_cancel<F, C>(
        &self,
        event: EventType,
        callback: F,
        on_cancel: C,
        cache_offline: bool,
    ) -> SdkResult<SubscriptionId>
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
        C: Fn(&RemoteError) + Send + Sync + 'static,
    {
        self.subscribe(event, Arc::new(callback), Some(Arc::new(on_cancel)), cache_offline, true)
    }

    /// Remove a subscription made through any reference. Returns `false`
    /// if it was already gone.
    pub fn off(&self, id: SubscriptionId) -> SdkResult<bool> {
        Ok(self.db.remote().unsubscribe(id)?)
    }

    /// Overwrite the value here. `None` deletes it.
    pub fn set(&self, value: Option<&TreeValue>) -> SdkResult<()> {
        Ok(self.db.remote().write(&self.path, value)?)
    }

    /// Overwrite the value here from the database's JSON export format.
    pub fn set_export(&self, value: &Value) -> SdkResult<()> {
        let parsed = TreeValue::from_export(value)?;
        self.set(parsed.as_ref())
    }

    pub fn set_priority(&self, priority: Option<&Primitive>) -> SdkResult<()> {
        Ok(self.db.remote().write_priority(&self.path, priority)?)
    }

    pub fn keep_synced(&self) -> SdkResult<()> {
        Ok(self.db.remote().keep_synced(&self.path)?)
    }

    fn subscribe(
        &self,
        event: EventType,
        callback: DataCallback,
        on_cancel: Option<CancelCallback>,
        cache_offline: bool,
        once: bool,
    ) -> SdkResult<SubscriptionId> {
        let callback = if cache_offline {
            caching(
                event,
                Arc::clone(self.db.cache_handle()),
                self.db.error_handler().cloned(),
                callback,
            )
        } else {
            callback
        };
        let remote = self.db.remote();
        let id = if once {
            remote.subscribe_once(&self.path, event, callback, on_cancel)?
        } else {
            remote.subscribe(&self.path, event, callback, on_cancel)?
        };
        Ok(id)
    }
}

impl<R, S> Clone for OfflineRef<R, S> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            path: self.path.clone(),
        }
    }
}

impl<R, S> std::fmt::Debug for OfflineRef<R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineRef").field("path", &self.path).finish()
    }
}

/// Wrap `callback` so each snapshot is stored at its own path first. A
/// `ChildRemoved` snapshot carries the removed child's last data, so its
/// subtree is forgotten instead.
///
/// A failed store is logged and reported to `on_error`; `callback` still
/// runs.
fn caching<S>(
    event: EventType,
    cache: Arc<OfflineCache<S>>,
    on_error: Option<ErrorHandler>,
    callback: DataCallback,
) -> DataCallback
where
    S: DurableStorage + 'static,
{
    Arc::new(move |snapshot: &Snapshot| {
        let cached = match event {
            EventType::ChildRemoved => cache.forget(&snapshot.path).map(drop),
            _ => cache.store_snapshot(snapshot).map(drop),
        };
        if let Err(err) = cached {
            warn!(path = %snapshot.path, %event, error = %err, "failed to cache snapshot");
            if let Some(handler) = &on_error {
                handler(&snapshot.path, &err);
            }
        }
        callback(snapshot);
    })
}
