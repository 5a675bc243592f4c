//! Foundation types for ofb.
//!
//! This crate provides the value and location types shared by every other
//! ofb crate: the tree values a realtime database exports, the priority
//! metadata attached to them, and the `/`-delimited paths that address them.
//!
//! # Key Types
//!
//! - [`Primitive`]: leaf scalar (string, number, or boolean)
//! - [`TreeValue`]: recursive tree value with optional per-node priority
//! - [`TreeNode`]: a non-primitive node: priority, value, and children
//! - [`Path`]: ordered segment list identifying a location in the tree

pub mod error;
pub mod path;
pub mod tree;

pub use error::TypeError;
pub use path::Path;
pub use tree::{set_at, Primitive, TreeNode, TreeValue, PRIORITY_KEY, VALUE_KEY};
