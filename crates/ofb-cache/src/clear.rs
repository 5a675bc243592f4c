//! Deletion of cache entries.

use ofb_storage::DurableStorage;
use ofb_types::Path;
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::keys::{scan_prefix, KeyKind, StorageKey};

/// Delete every entry in the cache's namespace, of any kind. Keys outside
/// the namespace are left alone. Returns the number of entries removed.
///
/// The remote store's own in-memory cache is not affected: data it already
/// holds stays available until the process exits.
pub fn clear_all<S>(storage: &S, config: &CacheConfig) -> CacheResult<usize>
where
    S: DurableStorage + ?Sized,
{
    let removed = storage.remove_prefix(&config.namespace)?;
    info!(namespace = %config.namespace, removed, "cleared offline cache");
    Ok(removed)
}

/// Delete every entry of either kind at or beneath `root`, so a later
/// restore no longer knows the subtree. Returns the number of entries
/// removed.
pub fn forget<S>(storage: &S, config: &CacheConfig, root: &Path) -> CacheResult<usize>
where
    S: DurableStorage + ?Sized,
{
    let namespace = &config.namespace;
    let removed = invalidate(storage, namespace, root)?
        + remove_under(storage, namespace, KeyKind::Full, root)?;
    debug!(%root, removed, "forgot subtree");
    Ok(removed)
}

/// Delete every `partial` entry at or beneath `root`.
///
/// Matching is by whole path segments, so invalidating `/x` keeps the
/// fragments of `/xy`.
pub(crate) fn invalidate<S>(storage: &S, namespace: &str, root: &Path) -> CacheResult<usize>
where
    S: DurableStorage + ?Sized,
{
    remove_under(storage, namespace, KeyKind::Partial, root)
}

fn remove_under<S>(storage: &S, namespace: &str, kind: KeyKind, root: &Path) -> CacheResult<usize>
where
    S: DurableStorage + ?Sized,
{
    let mut removed = 0;
    for key in storage.keys_with_prefix(&scan_prefix(namespace, kind, root))? {
        let under_root = StorageKey::decode(namespace, &key)
            .is_some_and(|decoded| decoded.kind == kind && decoded.path.starts_with(root));
        if under_root && storage.remove(&key)? {
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofb_storage::InMemoryStorage;

    fn seeded() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        for key in [
            "ofb_partial_/x",
            "ofb_partial_/x/a",
            "ofb_partial_/xy",
            "ofb_full_/x",
            "session_token",
        ] {
            storage.set(key, "1").unwrap();
        }
        storage
    }

    #[test]
    fn clear_all_keeps_foreign_keys() {
        let storage = seeded();
        assert_eq!(clear_all(&storage, &CacheConfig::default()).unwrap(), 4);
        assert_eq!(storage.keys().unwrap(), vec!["session_token"]);
    }

    #[test]
    fn clear_all_respects_custom_namespace() {
        let storage = seeded();
        storage.set("app_full_/x", "1").unwrap();
        let removed = clear_all(&storage, &CacheConfig::with_namespace("app_")).unwrap();
        assert_eq!(removed, 1);
        assert!(storage.get("ofb_full_/x").unwrap().is_some());
    }

    #[test]
    fn invalidate_matches_whole_segments() {
        let storage = seeded();
        assert_eq!(invalidate(&storage, "ofb_", &Path::parse("/x")).unwrap(), 2);
        assert!(storage.get("ofb_partial_/xy").unwrap().is_some());
        assert!(storage.get("ofb_full_/x").unwrap().is_some());
    }

    #[test]
    fn invalidate_root_removes_every_fragment() {
        let storage = seeded();
        assert_eq!(invalidate(&storage, "ofb_", &Path::root()).unwrap(), 3);
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn forget_removes_fragments_and_markers_beneath_root() {
        let storage = seeded();
        storage.set("ofb_full_/x/a", "1").unwrap();
        storage.set("ofb_full_/xy", "1").unwrap();
        let removed = forget(&storage, &CacheConfig::default(), &Path::parse("/x")).unwrap();
        assert_eq!(removed, 4);
        assert_eq!(
            storage.keys().unwrap(),
            vec!["ofb_full_/xy", "ofb_partial_/xy", "session_token"]
        );
    }
}
