//! The offline cache engine.
//!
//! A realtime database keeps the data it has seen in memory only. This crate
//! persists that data into durable storage as it is observed, and feeds it
//! back into the database on a cold start so an application has data before
//! it is online.
//!
//! # Architecture
//!
//! - **Flattening** ([`Flattener`]) walks an observed subtree and writes one
//!   storage entry (a *fragment*) per meaningful node, keyed by the node's
//!   full path. A `full` marker records the subtree's root as restorable.
//!   Fragments left over from an earlier store of the same root are removed
//!   first, so data deleted on the server does not come back.
//! - **Reconstruction** ([`Reconstructor`], [`KeyIndex`]) inverts this: it
//!   gathers every fragment under a root and rebuilds the nested tree,
//!   priorities included.
//! - **Restoration** ([`restore_all`]) rebuilds every recorded root, then
//!   writes data deepest path first and finally sets priorities, which
//!   require their nodes to exist.
//!
//! # Storage Layout
//!
//! Keys are `<namespace><kind>_<path>`, with `kind` either `partial` (one
//! fragment) or `full` (root marker, value `1`). See [`keys`].
//!
//! # Modules
//!
//! - [`config`]: [`CacheConfig`]
//! - [`keys`]: key naming
//! - [`fragment`]: fragment encoding
//! - [`flatten`]: the flattener
//! - [`reconstruct`]: key index and reconstructor
//! - [`restore`]: ordered restoration into a remote store
//! - [`clear`]: namespace and root-scoped deletion
//! - [`cache`]: the [`OfflineCache`] facade

pub mod cache;
pub mod clear;
pub mod config;
pub mod error;
pub mod flatten;
pub mod fragment;
pub mod keys;
pub mod reconstruct;
pub mod restore;

pub use cache::OfflineCache;
pub use clear::{clear_all, forget};
pub use config::{CacheConfig, DEFAULT_NAMESPACE};
pub use error::{CacheError, CacheResult};
pub use flatten::{flatten, Flattener, StoreReport};
pub use fragment::Fragment;
pub use keys::{KeyKind, StorageKey, FULL_SENTINEL};
pub use reconstruct::{KeyIndex, Reconstructor};
pub use restore::{restore_all, RestoreReport};
