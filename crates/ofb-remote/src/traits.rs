//! The [`RemoteStore`] trait defining the remote database interface.

use ofb_types::{Path, Primitive, TreeValue};

use crate::error::Result;
use crate::event::{CancelCallback, DataCallback, EventType, SubscriptionId};

/// A realtime tree database client.
///
/// Implementations deliver snapshots to subscription callbacks on their own
/// delivery loop. Callbacks may call back into the store, so implementations
/// must not hold internal locks while invoking them.
pub trait RemoteStore: Send + Sync {
    /// Register `on_data` for `event` at `path` until unsubscribed.
    ///
    /// `on_cancel` is invoked if the store later revokes the subscription.
    fn subscribe(
        &self,
        path: &Path,
        event: EventType,
        on_data: DataCallback,
        on_cancel: Option<CancelCallback>,
    ) -> Result<SubscriptionId>;

    /// Register `on_data` for the next `event` at `path` only.
    fn subscribe_once(
        &self,
        path: &Path,
        event: EventType,
        on_data: DataCallback,
        on_cancel: Option<CancelCallback>,
    ) -> Result<SubscriptionId>;

    /// Remove a subscription. Returns `Ok(false)` if it was already gone.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool>;

    /// Overwrite the full value at `path`. `None` deletes the node.
    fn write(&self, path: &Path, value: Option<&TreeValue>) -> Result<()>;

    /// Set (or clear) the priority of the node at `path`.
    ///
    /// Fails if the node does not exist.
    fn write_priority(&self, path: &Path, priority: Option<&Primitive>) -> Result<()>;

    /// Ask the store to keep `path` in its local cache even without an
    /// active listener.
    ///
    /// Default implementation is a no-op, for stores that retain every
    /// written value.
    fn keep_synced(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    /// The location of child `name` under `parent`.
    fn child_path(&self, parent: &Path, name: &str) -> Path {
        parent.child(name)
    }
}
