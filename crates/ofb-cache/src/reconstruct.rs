//! Tree reconstruction.
//!
//! [`KeyIndex`] loads the cache's entries from one enumeration of the key
//! space and keeps fragments ordered by [`Path`]. Because a path sorts
//! directly before its descendants, the fragments of any root form one
//! contiguous range, so rebuilding many roots costs one scan instead of one
//! scan per root.

use std::collections::{BTreeMap, BTreeSet};

use ofb_storage::DurableStorage;
use ofb_types::{Path, Primitive, TreeNode, TreeValue};
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::fragment::Fragment;
use crate::keys::{scan_prefix, KeyKind, StorageKey};

/// A raw fragment entry.
#[derive(Clone, Debug)]
struct RawFragment {
    key: String,
    raw: String,
}

/// The cache's entries, indexed by path.
#[derive(Clone, Debug, Default)]
pub struct KeyIndex {
    fragments: BTreeMap<Path, RawFragment>,
    roots: BTreeSet<Path>,
}

impl KeyIndex {
    /// Load every entry in `namespace`.
    pub fn build<S>(storage: &S, namespace: &str) -> CacheResult<Self>
    where
        S: DurableStorage + ?Sized,
    {
        Self::load(storage, namespace, namespace, None)
    }

    /// Load only the fragments at or beneath `root`. The result lists no
    /// roots.
    pub fn build_for<S>(storage: &S, namespace: &str, root: &Path) -> CacheResult<Self>
    where
        S: DurableStorage + ?Sized,
    {
        let prefix = scan_prefix(namespace, KeyKind::Partial, root);
        Self::load(storage, namespace, &prefix, Some(root))
    }

    fn load<S>(
        storage: &S,
        namespace: &str,
        prefix: &str,
        under: Option<&Path>,
    ) -> CacheResult<Self>
    where
        S: DurableStorage + ?Sized,
    {
        let mut index = KeyIndex::default();
        for key in storage.keys_with_prefix(prefix)? {
            let Some(decoded) = StorageKey::decode(namespace, &key) else {
                continue;
            };
            if under.is_some_and(|root| !decoded.path.starts_with(root)) {
                continue;
            }
            match decoded.kind {
                KeyKind::Full => {
                    index.roots.insert(decoded.path);
                }
                KeyKind::Partial => {
                    if let Some(raw) = storage.get(&key)? {
                        index.fragments.insert(decoded.path, RawFragment { key, raw });
                    }
                }
            }
        }
        Ok(index)
    }

    /// Every recorded root, in path order.
    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter()
    }

    /// Number of fragments loaded.
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Rebuild the tree stored under `root`.
    ///
    /// Returns `Ok(None)` when no fragment lies at or beneath `root`. A
    /// fragment that does not decode fails the whole call with
    /// [`CacheError::Decode`].
    pub fn reconstitute(&self, root: &Path) -> CacheResult<Option<TreeValue>> {
        let mut acc = PartialNode::default();
        let mut count = 0;
        let under_root = self
            .fragments
            .range(root.clone()..)
            .take_while(|(path, _)| path.starts_with(root));
        for (path, entry) in under_root {
            let fragment = Fragment::decode(&entry.raw).map_err(|source| CacheError::Decode {
                key: entry.key.clone(),
                source,
            })?;
            let relative = path.strip_prefix(root).unwrap_or_default();
            acc.descend(&relative).apply(fragment);
            count += 1;
        }
        debug!(%root, fragments = count, "reconstituted subtree");
        Ok(acc.build())
    }
}

/// Accumulator node. Intermediate nodes are created on first visit.
#[derive(Default)]
struct PartialNode {
    priority: Option<Primitive>,
    value: Option<Primitive>,
    children: BTreeMap<String, PartialNode>,
}

impl PartialNode {
    fn descend(&mut self, relative: &Path) -> &mut PartialNode {
        let mut node = self;
        for seg in relative.segments() {
            node = node.children.entry(seg.clone()).or_default();
        }
        node
    }

    /// Record a fragment. A bare primitive records an explicit absence of
    /// priority.
    fn apply(&mut self, fragment: Fragment) {
        match fragment {
            Fragment::Bare(value) => {
                self.priority = None;
                self.value = Some(value);
            }
            Fragment::Annotated { priority, value } => {
                self.priority = priority;
                self.value = value;
            }
        }
    }

    fn build(self) -> Option<TreeValue> {
        let children: BTreeMap<String, TreeValue> = self
            .children
            .into_iter()
            .filter_map(|(name, child)| child.build().map(|built| (name, built)))
            .collect();
        let value = if children.is_empty() { self.value } else { None };
        TreeNode {
            priority: self.priority,
            value,
            children,
        }
        .into_tree_value()
    }
}

/// Rebuilds stored subtrees from durable storage.
pub struct Reconstructor<'a, S: DurableStorage + ?Sized> {
    storage: &'a S,
    config: &'a CacheConfig,
}

impl<'a, S: DurableStorage + ?Sized> Reconstructor<'a, S> {
    pub fn new(storage: &'a S, config: &'a CacheConfig) -> Self {
        Self { storage, config }
    }

    /// Rebuild the tree stored under `root`, scanning only its fragments.
    pub fn reconstitute(&self, root: &Path) -> CacheResult<Option<TreeValue>> {
        KeyIndex::build_for(self.storage, &self.config.namespace, root)?.reconstitute(root)
    }

    /// Every root recorded by a completed store.
    pub fn roots(&self) -> CacheResult<Vec<Path>> {
        let prefix = KeyKind::Full.prefix(&self.config.namespace);
        let roots: BTreeSet<Path> = self
            .storage
            .keys_with_prefix(&prefix)?
            .iter()
            .filter_map(|key| StorageKey::decode(&self.config.namespace, key))
            .map(|decoded| decoded.path)
            .collect();
        Ok(roots.into_iter().collect())
    }

    /// Load the whole namespace once, for rebuilding many roots.
    pub fn index(&self) -> CacheResult<KeyIndex> {
        KeyIndex::build(self.storage, &self.config.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::Flattener;
    use ofb_storage::InMemoryStorage;
    use proptest::prelude::*;

    fn scenario() -> TreeValue {
        TreeValue::node()
            .with_priority(5)
            .with_child("a", TreeValue::leaf(1))
            .with_child(
                "b",
                TreeValue::node().with_priority(2).with_child("c", TreeValue::leaf(3)),
            )
    }

    fn stored(root: &str, tree: &TreeValue) -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        Flattener::new(&storage, &CacheConfig::default())
            .store(&Path::parse(root), Some(tree))
            .unwrap();
        storage
    }

    // -----------------------------------------------------------------------
    // Reconstitution
    // -----------------------------------------------------------------------

    #[test]
    fn scenario_round_trips() {
        let storage = stored("/x", &scenario());
        let config = CacheConfig::default();
        let rebuilt = Reconstructor::new(&storage, &config)
            .reconstitute(&Path::parse("/x"))
            .unwrap()
            .unwrap();
        assert_eq!(rebuilt, scenario());
        assert_eq!(
            rebuilt.to_export(),
            serde_json::json!({ ".priority": 5, "a": 1, "b": { ".priority": 2, "c": 3 } })
        );
    }

    #[test]
    fn subtree_of_a_stored_root() {
        let storage = stored("/x", &scenario());
        let config = CacheConfig::default();
        let rebuilt = Reconstructor::new(&storage, &config)
            .reconstitute(&Path::parse("/x/b"))
            .unwrap();
        assert_eq!(
            rebuilt,
            Some(TreeValue::node().with_priority(2).with_child("c", TreeValue::leaf(3)))
        );
    }

    #[test]
    fn unknown_root_is_none() {
        let storage = stored("/x", &scenario());
        let config = CacheConfig::default();
        let rebuilt = Reconstructor::new(&storage, &config)
            .reconstitute(&Path::parse("/nope"))
            .unwrap();
        assert_eq!(rebuilt, None);
    }

    #[test]
    fn sibling_prefix_is_not_included() {
        let storage = stored("/x", &TreeValue::leaf(1));
        Flattener::new(&storage, &CacheConfig::default())
            .store(&Path::parse("/xy"), Some(&TreeValue::leaf(2)))
            .unwrap();
        let config = CacheConfig::default();
        let rebuilt = Reconstructor::new(&storage, &config)
            .reconstitute(&Path::parse("/x"))
            .unwrap();
        assert_eq!(rebuilt, Some(TreeValue::leaf(1)));
    }

    #[test]
    fn falsy_values_survive() {
        let tree = TreeValue::node()
            .with_priority(0)
            .with_child("zero", TreeValue::leaf(0))
            .with_child("empty", TreeValue::leaf(""))
            .with_child("no", TreeValue::leaf(false).with_priority(""));
        let storage = stored("/f", &tree);
        let config = CacheConfig::default();
        let rebuilt = Reconstructor::new(&storage, &config)
            .reconstitute(&Path::parse("/f"))
            .unwrap();
        assert_eq!(rebuilt, Some(tree));
    }

    #[test]
    fn root_path_round_trips() {
        let storage = stored("/", &scenario());
        let config = CacheConfig::default();
        let rebuilt = Reconstructor::new(&storage, &config)
            .reconstitute(&Path::root())
            .unwrap();
        assert_eq!(rebuilt, Some(scenario()));
    }

    #[test]
    fn malformed_fragment_is_a_decode_error() {
        let storage = stored("/x", &scenario());
        storage.set("ofb_partial_/x/a", "{broken").unwrap();
        let config = CacheConfig::default();
        let err = Reconstructor::new(&storage, &config)
            .reconstitute(&Path::parse("/x"))
            .unwrap_err();
        assert!(matches!(err, CacheError::Decode { ref key, .. } if key == "ofb_partial_/x/a"));
    }

    // -----------------------------------------------------------------------
    // Index
    // -----------------------------------------------------------------------

    #[test]
    fn roots_are_listed_from_full_markers() {
        let storage = stored("/x", &scenario());
        Flattener::new(&storage, &CacheConfig::default())
            .store(&Path::parse("/a/b"), Some(&TreeValue::leaf(1)))
            .unwrap();
        storage.set("unrelated", "1").unwrap();
        let config = CacheConfig::default();
        let reconstructor = Reconstructor::new(&storage, &config);
        assert_eq!(
            reconstructor.roots().unwrap(),
            vec![Path::parse("/a/b"), Path::parse("/x")]
        );

        let index = reconstructor.index().unwrap();
        let roots: Vec<&Path> = index.roots().collect();
        assert_eq!(roots, vec![&Path::parse("/a/b"), &Path::parse("/x")]);
        assert_eq!(index.fragment_count(), 5);
    }

    #[test]
    fn one_index_serves_every_root() {
        let storage = stored("/x", &scenario());
        Flattener::new(&storage, &CacheConfig::default())
            .store(&Path::parse("/y"), Some(&TreeValue::leaf("y")))
            .unwrap();
        let index = KeyIndex::build(&storage, "ofb_").unwrap();
        assert_eq!(index.reconstitute(&Path::parse("/x")).unwrap(), Some(scenario()));
        assert_eq!(index.reconstitute(&Path::parse("/y")).unwrap(), Some(TreeValue::leaf("y")));
    }

    #[test]
    fn scoped_index_skips_other_roots() {
        let storage = stored("/x", &scenario());
        Flattener::new(&storage, &CacheConfig::default())
            .store(&Path::parse("/xy"), Some(&TreeValue::leaf(1)))
            .unwrap();
        let index = KeyIndex::build_for(&storage, "ofb_", &Path::parse("/x")).unwrap();
        assert_eq!(index.fragment_count(), 4);
        assert_eq!(index.roots().count(), 0);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn primitive() -> impl Strategy<Value = Primitive> {
        prop_oneof![
            any::<bool>().prop_map(Primitive::Bool),
            any::<i64>().prop_map(Primitive::from),
            "[a-z]{0,6}".prop_map(Primitive::from),
        ]
    }

    fn tree() -> impl Strategy<Value = TreeValue> {
        let leaf = prop_oneof![
            primitive().prop_map(TreeValue::Primitive),
            (primitive(), primitive()).prop_map(|(value, priority)| {
                TreeValue::Primitive(value).set_priority(Some(priority))
            }),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            (
                proptest::option::of(primitive()),
                proptest::collection::btree_map("[a-z]{1,3}", inner, 1..4),
            )
                .prop_map(|(priority, children)| {
                    TreeValue::Node(TreeNode {
                        priority,
                        value: None,
                        children,
                    })
                })
        })
    }

    proptest! {
        #[test]
        fn store_then_reconstitute_round_trips(value in tree()) {
            let storage = stored("/r", &value);
            let config = CacheConfig::default();
            let rebuilt = Reconstructor::new(&storage, &config)
                .reconstitute(&Path::parse("/r"))
                .unwrap();
            prop_assert_eq!(rebuilt, Some(value));
        }

        #[test]
        fn storing_twice_matches_storing_once(first in tree(), second in tree()) {
            let config = CacheConfig::default();
            let root = Path::parse("/r");

            let once = InMemoryStorage::new();
            Flattener::new(&once, &config).store(&root, Some(&second)).unwrap();

            let twice = InMemoryStorage::new();
            let flattener = Flattener::new(&twice, &config);
            flattener.store(&root, Some(&first)).unwrap();
            flattener.store(&root, Some(&second)).unwrap();
            flattener.store(&root, Some(&second)).unwrap();

            prop_assert_eq!(once.snapshot(), twice.snapshot());
        }
    }
}
