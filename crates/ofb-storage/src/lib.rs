//! Durable key-value storage for ofb.
//!
//! The offline cache persists tree fragments into a synchronous,
//! string-keyed store, the way a browser persists into `localStorage`. This
//! crate defines that contract and ships two backends.
//!
//! # Storage Backends
//!
//! All backends implement the [`DurableStorage`] trait:
//!
//! - [`InMemoryStorage`] -- `BTreeMap`-based store for tests and embedding,
//!   with an optional byte quota
//! - [`JsonFileStorage`] -- single JSON file, rewritten atomically on every
//!   mutation
//!
//! # Design Rules
//!
//! 1. Operations are synchronous and unbuffered: when `set` returns `Ok`, the
//!    value is stored.
//! 2. The store never interprets keys or values.
//! 3. A rejected write leaves the previous contents untouched.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StorageError, StorageResult};
pub use file::JsonFileStorage;
pub use memory::InMemoryStorage;
pub use traits::DurableStorage;
