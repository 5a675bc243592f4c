//! The remote tree database, as seen by the offline cache.
//!
//! The realtime database client is an external collaborator. This crate
//! captures the handful of operations the cache needs from it -- subscribe,
//! write, and priority writes -- as the [`RemoteStore`] trait, together with
//! the event and snapshot types its callbacks receive.
//!
//! # Modules
//!
//! - [`error`]: Error types for remote operations
//! - [`event`]: [`EventType`], [`Snapshot`], subscription callbacks
//! - [`traits`]: The [`RemoteStore`] trait
//! - [`memory`]: [`InMemoryRemoteStore`], a local-cache-only store for tests
//!   and offline embedding

pub mod error;
pub mod event;
pub mod memory;
pub mod traits;

pub use error::{RemoteError, Result};
pub use event::{CancelCallback, DataCallback, EventType, Snapshot, SubscriptionId};
pub use memory::{InMemoryRemoteStore, RemoteOp};
pub use traits::RemoteStore;
