//! Tree flattening.
//!
//! A stored tree becomes one `partial` entry per node that carries data of
//! its own:
//!
//! | node                                   | entry                    |
//! |----------------------------------------|--------------------------|
//! | bare primitive                         | the primitive            |
//! | leaf with priority and value           | `{.priority, .value}`    |
//! | node with children and a priority      | `{.priority}`, then kids |
//! | node with children, no priority        | none, then kids          |
//!
//! Intermediate nodes without a priority are implied by their descendants'
//! paths and never stored.

use ofb_storage::DurableStorage;
use ofb_types::{Path, TreeValue, PRIORITY_KEY, VALUE_KEY};
use tracing::debug;

use crate::clear::invalidate;
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::fragment::Fragment;
use crate::keys::{StorageKey, FULL_SENTINEL};

/// What a [`Flattener::store`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreReport {
    /// Stale fragments removed before writing.
    pub invalidated: usize,
    /// Fragments written.
    pub written: usize,
}

/// Flatten `value`, located at `root`, into `(path, fragment)` pairs in
/// pre-order.
pub fn flatten(root: &Path, value: &TreeValue) -> Vec<(Path, Fragment)> {
    let mut out = Vec::new();
    walk(root, value, &mut out);
    out
}

fn walk(path: &Path, value: &TreeValue, out: &mut Vec<(Path, Fragment)>) {
    let node = match value {
        TreeValue::Primitive(primitive) => {
            out.push((path.clone(), Fragment::Bare(primitive.clone())));
            return;
        }
        TreeValue::Node(node) => node,
    };

    if node.children.is_empty() {
        match (&node.priority, &node.value) {
            (Some(priority), Some(value)) => out.push((
                path.clone(),
                Fragment::Annotated {
                    priority: Some(priority.clone()),
                    value: Some(value.clone()),
                },
            )),
            (None, Some(value)) => out.push((path.clone(), Fragment::Bare(value.clone()))),
            // Nothing to restore: the database treats an empty node as absent.
            (_, None) => {}
        }
        return;
    }

    if let Some(priority) = &node.priority {
        out.push((path.clone(), Fragment::priority_only(priority.clone())));
    }
    for (name, child) in &node.children {
        if name == PRIORITY_KEY || name == VALUE_KEY {
            continue;
        }
        walk(&path.child(name), child, out);
    }
}

/// Persists observed subtrees into durable storage.
pub struct Flattener<'a, S: DurableStorage + ?Sized> {
    storage: &'a S,
    config: &'a CacheConfig,
}

impl<'a, S: DurableStorage + ?Sized> Flattener<'a, S> {
    pub fn new(storage: &'a S, config: &'a CacheConfig) -> Self {
        Self { storage, config }
    }

    /// Replace everything recorded under `root` with the fragments of
    /// `value`, then mark `root` as restorable.
    ///
    /// `None` is a no-op. Storing the same value twice leaves storage
    /// unchanged. If the medium fails midway (e.g. quota), the fragments
    /// written so far stay and the `full` marker is not written; the next
    /// successful store of `root` replaces them.
    pub fn store(&self, root: &Path, value: Option<&TreeValue>) -> CacheResult<StoreReport> {
        let Some(value) = value else {
            debug!(%root, "nothing to store");
            return Ok(StoreReport::default());
        };
        let namespace = &self.config.namespace;

        let invalidated = invalidate(self.storage, namespace, root)?;
        let batch = flatten(root, value)
            .into_iter()
            .map(|(path, fragment)| {
                let key = StorageKey::partial(path).encode(namespace);
                match fragment.encode() {
                    Ok(encoded) => Ok((key, encoded)),
                    Err(source) => Err(CacheError::Encode { key, source }),
                }
            })
            .collect::<CacheResult<Vec<_>>>()?;
        self.storage.set_many(&batch)?;
        self.storage
            .set(&StorageKey::full(root.clone()).encode(namespace), FULL_SENTINEL)?;

        debug!(%root, invalidated, written = batch.len(), "stored subtree");
        Ok(StoreReport {
            invalidated,
            written: batch.len(),
        })
    }
}
