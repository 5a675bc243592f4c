//! Restoration of cached trees into a remote store.
//!
//! Restoration runs in three phases:
//!
//! 1. Rebuild every recorded root from a single [`KeyIndex`]. Nothing is
//!    written yet: writes can fire cached subscriptions that store into the
//!    same key space, which must not happen while it is being read.
//! 2. Write each root's data, priorities stripped, deepest root first.
//! 3. Set every priority. A priority can only be set on a node that exists,
//!    so this runs after all data is in place.

use std::collections::BTreeMap;

use ofb_remote::RemoteStore;
use ofb_storage::DurableStorage;
use ofb_types::{Path, Primitive, TreeValue};
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::reconstruct::KeyIndex;

/// What a [`restore_all`] call did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Roots written, in write order.
    pub roots: Vec<Path>,
    /// Roots whose marker exists but whose fragments are all gone.
    pub skipped: Vec<Path>,
    /// Priority writes issued.
    pub priority_writes: usize,
}

/// Re-seed `remote` with every tree recorded in `storage`.
///
/// A remote failure stops restoration and is returned as is; writes already
/// issued are not undone.
pub fn restore_all<S, R>(
    storage: &S,
    remote: &R,
    config: &CacheConfig,
) -> CacheResult<RestoreReport>
where
    S: DurableStorage + ?Sized,
    R: RemoteStore + ?Sized,
{
    let index = KeyIndex::build(storage, &config.namespace)?;

    let mut rebuilt: Vec<(Path, TreeValue)> = Vec::new();
    let mut skipped = Vec::new();
    for root in index.roots() {
        match index.reconstitute(root)? {
            Some(tree) => rebuilt.push((root.clone(), tree)),
            None => {
                warn!(%root, "root has no fragments, skipping");
                skipped.push(root.clone());
            }
        }
    }
    rebuilt.sort_by(|(a, _), (b, _)| b.depth().cmp(&a.depth()).then_with(|| a.cmp(b)));

    // Nested roots report the same priorities; keep one write per path, in
    // path order so parents precede children.
    let priorities: BTreeMap<Path, Primitive> = rebuilt
        .iter()
        .flat_map(|(root, tree)| tree.priorities(root))
        .collect();

    for (root, tree) in &rebuilt {
        remote.keep_synced(root)?;
        remote.write(root, Some(&tree.without_priorities()))?;
        debug!(%root, "restored data");
    }

    for (path, priority) in &priorities {
        remote.write_priority(path, Some(priority))?;
    }

    let report = RestoreReport {
        roots: rebuilt.into_iter().map(|(root, _)| root).collect(),
        skipped,
        priority_writes: priorities.len(),
    };
    info!(
        roots = report.roots.len(),
        skipped = report.skipped.len(),
        priorities = report.priority_writes,
        "restored offline cache"
    );
    Ok(report)
}
