//! Error types for remote store operations.

use ofb_types::Path;
use thiserror::Error;

use crate::event::SubscriptionId;

/// Errors reported by a remote store.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The target node does not exist (e.g. a priority write on a missing
    /// node).
    #[error("node not found: {0}")]
    NodeNotFound(Path),

    /// The store refused the write (validation rules, permissions).
    #[error("write rejected at {path}: {reason}")]
    WriteRejected { path: Path, reason: String },

    /// The subscription was cancelled by the store.
    #[error("subscription cancelled at {path}: {reason}")]
    Cancelled { path: Path, reason: String },

    /// No subscription exists with this ID.
    #[error("unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),
}

/// Convenience type alias for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
