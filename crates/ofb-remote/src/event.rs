use std::fmt;
use std::sync::Arc;

use ofb_types::{Path, TreeValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;

/// The kind of change a subscription listens for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// The whole value at the subscribed path.
    Value,
    /// A child appeared under the subscribed path.
    ChildAdded,
    /// A child's value changed.
    ChildChanged,
    /// A child was removed.
    ChildRemoved,
    /// A child's priority changed, moving it in priority order.
    ChildMoved,
}

impl EventType {
    /// Returns `true` for the child-level event kinds.
    pub fn is_child_event(&self) -> bool {
        !matches!(self, EventType::Value)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Value => "value",
            EventType::ChildAdded => "child_added",
            EventType::ChildChanged => "child_changed",
            EventType::ChildRemoved => "child_removed",
            EventType::ChildMoved => "child_moved",
        };
        f.write_str(name)
    }
}

/// Identifier of a registered subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

/// A read-only view of a subtree delivered to a subscription callback.
///
/// `path` is the location the snapshot describes: the subscribed path for
/// value events, the child's path for child events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub path: Path,
    pub exported: Option<TreeValue>,
}

impl Snapshot {
    pub fn new(path: Path, exported: Option<TreeValue>) -> Self {
        Self { path, exported }
    }

    /// Returns `true` if there is data at this location.
    pub fn exists(&self) -> bool {
        self.exported.is_some()
    }

    /// The last path segment, or `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.path.last()
    }

    /// The exported value in the database's JSON export format, including
    /// priorities. `null` when there is no data.
    pub fn export_val(&self) -> Value {
        self.exported
            .as_ref()
            .map_or(Value::Null, TreeValue::to_export)
    }
}

/// Callback receiving snapshots for a subscription.
pub type DataCallback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Callback invoked when the store cancels a subscription.
pub type CancelCallback = Arc<dyn Fn(&RemoteError) + Send + Sync>;
