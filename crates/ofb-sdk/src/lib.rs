//! Offline caching for realtime tree database clients.
//!
//! [`OfflineDatabase`] decorates a [`RemoteStore`] with an [`OfflineCache`].
//! References obtained from it behave like the client's own, except that a
//! subscription opened with `cache_offline` persists every snapshot it
//! receives. On the next cold start, [`OfflineDatabase::restore`] feeds the
//! persisted trees back into the client before it reaches the server.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ofb_sdk::{EventType, InMemoryRemoteStore, JsonFileStorage, OfflineDatabase};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = JsonFileStorage::open("offline.json")?;
//! let db = OfflineDatabase::new(Arc::new(InMemoryRemoteStore::new()), storage);
//! db.restore()?;
//! db.reference("/users/alice").on(EventType::Value, |snap| {
//!     println!("{}", snap.export_val());
//! }, true)?;
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod error;
pub mod reference;

pub use database::{ErrorHandler, OfflineDatabase};
pub use error::{SdkError, SdkResult};
pub use reference::OfflineRef;

// Re-export key types
pub use ofb_cache::{CacheConfig, CacheError, OfflineCache, RestoreReport, StoreReport};
pub use ofb_remote::{
    EventType, InMemoryRemoteStore, RemoteError, RemoteStore, Snapshot, SubscriptionId,
};
pub use ofb_storage::{DurableStorage, InMemoryStorage, JsonFileStorage};
pub use ofb_types::{Path, Primitive, TreeValue};
