//! In-memory remote store for tests and offline embedding.
//!
//! [`InMemoryRemoteStore`] behaves like a database client that never reaches
//! its server: every write lands in its local cache and is delivered to
//! matching subscriptions synchronously. It records every accepted operation
//! in an operation log so callers can assert on write ordering.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use ofb_types::{set_at, Path, Primitive, TreeValue};
use tracing::debug;

use crate::error::{RemoteError, Result};
use crate::event::{CancelCallback, DataCallback, EventType, Snapshot, SubscriptionId};
use crate::traits::RemoteStore;

/// An operation accepted by [`InMemoryRemoteStore`], in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteOp {
    Write {
        path: Path,
        value: Option<TreeValue>,
    },
    SetPriority {
        path: Path,
        priority: Option<Primitive>,
    },
    KeepSynced {
        path: Path,
    },
}

impl RemoteOp {
    /// The path this operation targeted.
    pub fn path(&self) -> &Path {
        match self {
            RemoteOp::Write { path, .. }
            | RemoteOp::SetPriority { path, .. }
            | RemoteOp::KeepSynced { path } => path,
        }
    }
}

struct Subscription {
    path: Path,
    event: EventType,
    on_data: DataCallback,
    on_cancel: Option<CancelCallback>,
    once: bool,
}

#[derive(Default)]
struct RemoteState {
    root: Option<TreeValue>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    next_id: u64,
    ops: Vec<RemoteOp>,
    synced: BTreeSet<Path>,
    rejected: Vec<Path>,
}

/// Pending callback invocations, run after the state lock is released.
type Deliveries = Vec<(DataCallback, Snapshot)>;

/// A remote store backed only by its local cache.
pub struct InMemoryRemoteStore {
    inner: RwLock<RemoteState>,
}

impl InMemoryRemoteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RemoteState::default()),
        }
    }

    /// Create a store whose cache already holds `root`. Nothing is logged.
    pub fn with_data(root: TreeValue) -> Self {
        Self {
            inner: RwLock::new(RemoteState {
                root: Some(root),
                ..RemoteState::default()
            }),
        }
    }

    /// The cached value at `path`.
    pub fn value(&self, path: &Path) -> Option<TreeValue> {
        let state = self.inner.read().expect("lock poisoned");
        value_at(&state.root, path)
    }

    /// Every accepted operation so far.
    pub fn ops(&self) -> Vec<RemoteOp> {
        self.inner.read().expect("lock poisoned").ops.clone()
    }

    /// Forget the operation log.
    pub fn clear_ops(&self) {
        self.inner.write().expect("lock poisoned").ops.clear();
    }

    /// Paths registered through [`RemoteStore::keep_synced`].
    pub fn synced_paths(&self) -> Vec<Path> {
        let state = self.inner.read().expect("lock poisoned");
        state.synced.iter().cloned().collect()
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.read().expect("lock poisoned").subscriptions.len()
    }

    /// Reject every later write or priority write at or beneath `path`, the
    /// way server-side validation rules would.
    pub fn reject_writes_at(&self, path: &Path) {
        self.inner
            .write()
            .expect("lock poisoned")
            .rejected
            .push(path.clone());
    }

    /// Revoke every subscription at or beneath `path`, invoking their cancel
    /// callbacks. Returns how many were revoked.
    pub fn cancel_subscriptions(&self, path: &Path, reason: &str) -> usize {
        let cancelled: Vec<(Path, Option<CancelCallback>)> = {
            let mut state = self.inner.write().expect("lock poisoned");
            let ids: Vec<SubscriptionId> = state
                .subscriptions
                .iter()
                .filter(|(_, sub)| sub.path.starts_with(path))
                .map(|(id, _)| *id)
                .collect();
            ids.iter()
                .filter_map(|id| state.subscriptions.remove(id))
                .map(|sub| (sub.path, sub.on_cancel))
                .collect()
        };
        let count = cancelled.len();
        for (sub_path, on_cancel) in cancelled {
            if let Some(on_cancel) = on_cancel {
                on_cancel(&RemoteError::Cancelled {
                    path: sub_path,
                    reason: reason.to_string(),
                });
            }
        }
        count
    }

    fn register(
        &self,
        path: &Path,
        event: EventType,
        on_data: DataCallback,
        on_cancel: Option<CancelCallback>,
        once: bool,
    ) -> SubscriptionId {
        let (id, deliveries) = {
            let mut state = self.inner.write().expect("lock poisoned");
            state.next_id += 1;
            let id = SubscriptionId(state.next_id);
            let initial = initial_snapshots(&state.root, path, event);
            let deliveries: Deliveries = if once {
                initial.into_iter().take(1).map(|snap| (on_data.clone(), snap)).collect()
            } else {
                initial.into_iter().map(|snap| (on_data.clone(), snap)).collect()
            };
            // A once-subscription satisfied by existing data is never stored.
            if !(once && !deliveries.is_empty()) {
                state.subscriptions.insert(
                    id,
                    Subscription {
                        path: path.clone(),
                        event,
                        on_data,
                        on_cancel,
                        once,
                    },
                );
            }
            (id, deliveries)
        };
        debug!(%id, %path, %event, initial = deliveries.len(), "subscribed");
        deliver(deliveries);
        id
    }

    /// Apply `mutate` to the cached root, log `op`, and notify subscribers of
    /// every observable change.
    fn apply(
        &self,
        op: RemoteOp,
        mutate: impl FnOnce(Option<TreeValue>) -> Result<Option<TreeValue>>,
    ) -> Result<()> {
        let deliveries = {
            let mut state = self.inner.write().expect("lock poisoned");
            if let Some(rule) = state.rejected.iter().find(|p| op.path().starts_with(p)) {
                return Err(RemoteError::WriteRejected {
                    path: op.path().clone(),
                    reason: format!("writes beneath {rule} are rejected"),
                });
            }
            let old = state.root.clone();
            state.root = mutate(old.clone())?;
            state.ops.push(op);
            let deliveries = changed_snapshots(&state, &old);
            let fired_once: Vec<SubscriptionId> = deliveries
                .iter()
                .filter(|(_, once, _)| *once)
                .map(|(id, _, _)| *id)
                .collect();
            for id in fired_once {
                state.subscriptions.remove(&id);
            }
            dedup_once(deliveries)
        };
        deliver(deliveries);
        Ok(())
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for InMemoryRemoteStore {
    fn subscribe(
        &self,
        path: &Path,
        event: EventType,
        on_data: DataCallback,
        on_cancel: Option<CancelCallback>,
    ) -> Result<SubscriptionId> {
        Ok(self.register(path, event, on_data, on_cancel, false))
    }

    fn subscribe_once(
        &self,
        path: &Path,
        event: EventType,
        on_data: DataCallback,
        on_cancel: Option<CancelCallback>,
    ) -> Result<SubscriptionId> {
        Ok(self.register(path, event, on_data, on_cancel, true))
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        let mut state = self.inner.write().expect("lock poisoned");
        Ok(state.subscriptions.remove(&id).is_some())
    }

    fn write(&self, path: &Path, value: Option<&TreeValue>) -> Result<()> {
        let op = RemoteOp::Write {
            path: path.clone(),
            value: value.cloned(),
        };
        self.apply(op, |root| Ok(set_at(root, path, value.cloned())))
    }

    fn write_priority(&self, path: &Path, priority: Option<&Primitive>) -> Result<()> {
        let op = RemoteOp::SetPriority {
            path: path.clone(),
            priority: priority.cloned(),
        };
        self.apply(op, |root| {
            let node = value_at(&root, path)
                .ok_or_else(|| RemoteError::NodeNotFound(path.clone()))?;
            let updated = node.set_priority(priority.cloned());
            Ok(set_at(root, path, Some(updated)))
        })
    }

    fn keep_synced(&self, path: &Path) -> Result<()> {
        let mut state = self.inner.write().expect("lock poisoned");
        state.synced.insert(path.clone());
        state.ops.push(RemoteOp::KeepSynced { path: path.clone() });
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryRemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read().expect("lock poisoned");
        f.debug_struct("InMemoryRemoteStore")
            .field("subscriptions", &state.subscriptions.len())
            .field("ops", &state.ops.len())
            .finish()
    }
}

fn value_at(root: &Option<TreeValue>, path: &Path) -> Option<TreeValue> {
    root.as_ref().and_then(|r| r.get(path)).cloned()
}

fn children_at(root: &Option<TreeValue>, path: &Path) -> BTreeMap<String, TreeValue> {
    root.as_ref()
        .and_then(|r| r.get(path))
        .map(|v| v.children().map(|(k, c)| (k.clone(), c.clone())).collect())
        .unwrap_or_default()
}

fn initial_snapshots(root: &Option<TreeValue>, path: &Path, event: EventType) -> Vec<Snapshot> {
    match event {
        EventType::Value => vec![Snapshot::new(path.clone(), value_at(root, path))],
        EventType::ChildAdded => children_at(root, path)
            .into_iter()
            .map(|(name, child)| Snapshot::new(path.child(&name), Some(child)))
            .collect(),
        EventType::ChildChanged | EventType::ChildRemoved | EventType::ChildMoved => Vec::new(),
    }
}

/// Snapshots for every subscription whose observed data differs between
/// `old` and the current root, tagged with subscription ID and once-flag.
fn changed_snapshots(
    state: &RemoteState,
    old: &Option<TreeValue>,
) -> Vec<(SubscriptionId, bool, (DataCallback, Snapshot))> {
    let mut out = Vec::new();
    for (id, sub) in &state.subscriptions {
        let snapshots = match sub.event {
            EventType::Value => {
                let before = value_at(old, &sub.path);
                let after = value_at(&state.root, &sub.path);
                if before == after {
                    Vec::new()
                } else {
                    vec![Snapshot::new(sub.path.clone(), after)]
                }
            }
            event => child_changes(old, &state.root, &sub.path, event),
        };
        for snap in snapshots {
            out.push((*id, sub.once, (sub.on_data.clone(), snap)));
        }
    }
    out
}

fn child_changes(
    old: &Option<TreeValue>,
    new: &Option<TreeValue>,
    path: &Path,
    event: EventType,
) -> Vec<Snapshot> {
    let before = children_at(old, path);
    let after = children_at(new, path);
    let names: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    let mut out = Vec::new();
    for name in names {
        let child_path = path.child(name);
        match (before.get(name), after.get(name), event) {
            (None, Some(added), EventType::ChildAdded) => {
                out.push(Snapshot::new(child_path, Some(added.clone())));
            }
            (Some(removed), None, EventType::ChildRemoved) => {
                out.push(Snapshot::new(child_path, Some(removed.clone())));
            }
            (Some(b), Some(a), EventType::ChildChanged) if b != a => {
                out.push(Snapshot::new(child_path, Some(a.clone())));
            }
            (Some(b), Some(a), EventType::ChildMoved) if b.priority() != a.priority() => {
                out.push(Snapshot::new(child_path, Some(a.clone())));
            }
            _ => {}
        }
    }
    out
}

/// Drop all but the first delivery of each once-subscription.
fn dedup_once(changes: Vec<(SubscriptionId, bool, (DataCallback, Snapshot))>) -> Deliveries {
    let mut seen = BTreeSet::new();
    changes
        .into_iter()
        .filter(|(id, once, _)| !*once || seen.insert(*id))
        .map(|(_, _, delivery)| delivery)
        .collect()
}

fn deliver(deliveries: Deliveries) {
    for (callback, snapshot) in deliveries {
        callback(&snapshot);
    }
}
