//! Tree values as exported by the realtime database.
//!
//! The database's export format is JSON where every node may carry two
//! reserved, dot-prefixed fields: `.priority` (ordering metadata) and `.value`
//! (the scalar of a leaf that also carries a priority). All other object keys
//! are child names. [`TreeValue`] is the typed form of that format.
//!
//! Presence is what matters for priorities and values, never truthiness: a
//! priority of `0` or a value of `""` is a real priority or value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::TypeError;
use crate::path::Path;

/// Reserved export key holding a node's priority.
pub const PRIORITY_KEY: &str = ".priority";

/// Reserved export key holding a leaf's scalar when it also has a priority.
pub const VALUE_KEY: &str = ".value";

/// A leaf scalar.
///
/// Serialized untagged, so it encodes as a bare JSON primitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Primitive {
    Bool(bool),
    Number(Number),
    String(String),
}

impl Primitive {
    /// Convert a JSON scalar. Returns `None` for null, arrays and objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Primitive::Bool(*b)),
            Value::Number(n) => Some(Primitive::Number(n.clone())),
            Value::String(s) => Some(Primitive::String(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// The JSON form of this scalar.
    pub fn to_json(&self) -> Value {
        match self {
            Primitive::Bool(b) => Value::Bool(*b),
            Primitive::Number(n) => Value::Number(n.clone()),
            Primitive::String(s) => Value::String(s.clone()),
        }
    }

    /// A floating point primitive. `None` for NaN and infinities.
    pub fn from_f64(f: f64) -> Option<Self> {
        Number::from_f64(f).map(Primitive::Number)
    }
}

impl From<&str> for Primitive {
    fn from(s: &str) -> Self {
        Primitive::String(s.to_string())
    }
}

impl From<String> for Primitive {
    fn from(s: String) -> Self {
        Primitive::String(s)
    }
}

impl From<i32> for Primitive {
    fn from(n: i32) -> Self {
        Primitive::Number(n.into())
    }
}

impl From<i64> for Primitive {
    fn from(n: i64) -> Self {
        Primitive::Number(n.into())
    }
}

impl From<u64> for Primitive {
    fn from(n: u64) -> Self {
        Primitive::Number(n.into())
    }
}

impl From<bool> for Primitive {
    fn from(b: bool) -> Self {
        Primitive::Bool(b)
    }
}

/// A non-primitive node.
///
/// A node with children is interior: its `value`, if any, is ignored by the
/// database and by the flattener. A node without children is a leaf that
/// carries a priority next to its scalar.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeNode {
    pub priority: Option<Primitive>,
    pub value: Option<Primitive>,
    pub children: BTreeMap<String, TreeValue>,
}

impl TreeNode {
    /// Collapse this node into its canonical tree value.
    ///
    /// A childless node without a value is empty (`None`); a childless node
    /// without a priority is a bare primitive.
    pub fn into_tree_value(self) -> Option<TreeValue> {
        if !self.children.is_empty() {
            return Some(TreeValue::Node(self));
        }
        match (self.priority, self.value) {
            (_, None) => None,
            (None, Some(value)) => Some(TreeValue::Primitive(value)),
            (Some(priority), Some(value)) => Some(TreeValue::Node(TreeNode {
                priority: Some(priority),
                value: Some(value),
                children: BTreeMap::new(),
            })),
        }
    }
}

/// An exported subtree: a bare primitive or a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeValue {
    Primitive(Primitive),
    Node(TreeNode),
}

impl TreeValue {
    /// A bare primitive leaf.
    pub fn leaf(value: impl Into<Primitive>) -> Self {
        TreeValue::Primitive(value.into())
    }

    /// An empty interior node, to be filled with [`TreeValue::with_child`].
    pub fn node() -> Self {
        TreeValue::Node(TreeNode::default())
    }

    /// Add (or replace) a child. A primitive is promoted to a node first and
    /// loses its scalar.
    pub fn with_child(self, name: impl Into<String>, child: TreeValue) -> Self {
        let mut node = self.into_node();
        node.value = None;
        node.children.insert(name.into(), child);
        TreeValue::Node(node)
    }

    /// Attach a priority to this value.
    pub fn with_priority(self, priority: impl Into<Primitive>) -> Self {
        self.set_priority(Some(priority.into()))
    }

    /// Replace (or clear) this value's priority.
    pub fn set_priority(self, priority: Option<Primitive>) -> Self {
        let mut node = self.into_node();
        node.priority = priority;
        if node.children.is_empty() && node.priority.is_none() {
            if let Some(value) = node.value.take() {
                return TreeValue::Primitive(value);
            }
        }
        TreeValue::Node(node)
    }

    fn into_node(self) -> TreeNode {
        match self {
            TreeValue::Primitive(value) => TreeNode {
                value: Some(value),
                ..TreeNode::default()
            },
            TreeValue::Node(node) => node,
        }
    }

    /// Returns `true` for a bare primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(self, TreeValue::Primitive(_))
    }

    /// This value's priority, if any.
    pub fn priority(&self) -> Option<&Primitive> {
        match self {
            TreeValue::Primitive(_) => None,
            TreeValue::Node(node) => node.priority.as_ref(),
        }
    }

    /// This value's scalar: the primitive itself, or a childless node's
    /// `.value`.
    pub fn value(&self) -> Option<&Primitive> {
        match self {
            TreeValue::Primitive(value) => Some(value),
            TreeValue::Node(node) if node.children.is_empty() => node.value.as_ref(),
            TreeValue::Node(_) => None,
        }
    }

    /// The children of this value. Empty for primitives.
    pub fn children(&self) -> impl Iterator<Item = (&String, &TreeValue)> {
        let children = match self {
            TreeValue::Primitive(_) => None,
            TreeValue::Node(node) => Some(node.children.iter()),
        };
        children.into_iter().flatten()
    }

    /// Returns `true` if this value has at least one child.
    pub fn has_children(&self) -> bool {
        matches!(self, TreeValue::Node(node) if !node.children.is_empty())
    }

    /// Look up the value at `path` relative to this one.
    pub fn get(&self, path: &Path) -> Option<&TreeValue> {
        let mut current = self;
        for seg in path.segments() {
            match current {
                TreeValue::Node(node) => current = node.children.get(seg)?,
                TreeValue::Primitive(_) => return None,
            }
        }
        Some(current)
    }

    /// Number of nodes carrying a value, primitives included.
    pub fn leaf_count(&self) -> usize {
        match self {
            TreeValue::Primitive(_) => 1,
            TreeValue::Node(node) => {
                usize::from(node.value.is_some())
                    + node.children.values().map(TreeValue::leaf_count).sum::<usize>()
            }
        }
    }

    /// A copy of this tree with every priority removed.
    pub fn without_priorities(&self) -> TreeValue {
        match self {
            TreeValue::Primitive(value) => TreeValue::Primitive(value.clone()),
            TreeValue::Node(node) if node.children.is_empty() => match &node.value {
                Some(value) => TreeValue::Primitive(value.clone()),
                None => TreeValue::node(),
            },
            TreeValue::Node(node) => TreeValue::Node(TreeNode {
                priority: None,
                value: None,
                children: node
                    .children
                    .iter()
                    .map(|(name, child)| (name.clone(), child.without_priorities()))
                    .collect(),
            }),
        }
    }

    /// Every priority in this tree, keyed by absolute path (this value sits
    /// at `base`). Parents are listed before their descendants.
    pub fn priorities(&self, base: &Path) -> Vec<(Path, Primitive)> {
        let mut out = Vec::new();
        collect_priorities(self, base, &mut out);
        out
    }

    /// Parse the database's export format.
    ///
    /// `null` yields `Ok(None)`. Null children are dropped, arrays become
    /// index-keyed children, and a node whose only content is a `.value`
    /// collapses to a bare primitive.
    pub fn from_export(value: &Value) -> Result<Option<TreeValue>, TypeError> {
        parse_export(value, &Path::root())
    }

    /// Render this value in the database's export format.
    pub fn to_export(&self) -> Value {
        match self {
            TreeValue::Primitive(value) => value.to_json(),
            TreeValue::Node(node) => {
                let mut map = Map::new();
                if let Some(priority) = &node.priority {
                    map.insert(PRIORITY_KEY.to_string(), priority.to_json());
                }
                if let Some(value) = &node.value {
                    map.insert(VALUE_KEY.to_string(), value.to_json());
                }
                for (name, child) in &node.children {
                    map.insert(name.clone(), child.to_export());
                }
                Value::Object(map)
            }
        }
    }
}

impl From<Primitive> for TreeValue {
    fn from(value: Primitive) -> Self {
        TreeValue::Primitive(value)
    }
}

/// Write `value` at `path` beneath `root`, returning the new root.
///
/// Intermediate nodes are created as needed; writing beneath a primitive
/// replaces it. Writing `None` deletes, and parents left empty disappear.
pub fn set_at(root: Option<TreeValue>, path: &Path, value: Option<TreeValue>) -> Option<TreeValue> {
    set_segments(root, path.segments(), value)
}

fn set_segments(
    current: Option<TreeValue>,
    segments: &[String],
    value: Option<TreeValue>,
) -> Option<TreeValue> {
    let Some((head, rest)) = segments.split_first() else {
        return value;
    };
    let mut node = match current {
        Some(TreeValue::Node(node)) => node,
        _ => TreeNode::default(),
    };
    let existing = node.children.remove(head);
    if let Some(child) = set_segments(existing, rest, value) {
        node.children.insert(head.clone(), child);
    }
    if !node.children.is_empty() {
        node.value = None;
    }
    node.into_tree_value()
}

fn collect_priorities(value: &TreeValue, path: &Path, out: &mut Vec<(Path, Primitive)>) {
    if let Some(priority) = value.priority() {
        out.push((path.clone(), priority.clone()));
    }
    for (name, child) in value.children() {
        collect_priorities(child, &path.child(name), out);
    }
}

fn parse_export(value: &Value, at: &Path) -> Result<Option<TreeValue>, TypeError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            Ok(Primitive::from_json(value).map(TreeValue::Primitive))
        }
        Value::Array(items) => {
            let mut node = TreeNode::default();
            for (index, item) in items.iter().enumerate() {
                let name = index.to_string();
                if let Some(child) = parse_export(item, &at.child(&name))? {
                    node.children.insert(name, child);
                }
            }
            Ok(node.into_tree_value())
        }
        Value::Object(map) => {
            let mut node = TreeNode {
                priority: parse_reserved(map, PRIORITY_KEY, at)?,
                value: parse_reserved(map, VALUE_KEY, at)?,
                children: BTreeMap::new(),
            };
            for (name, child) in map {
                if name == PRIORITY_KEY || name == VALUE_KEY {
                    continue;
                }
                if let Some(child) = parse_export(child, &at.child(name))? {
                    node.children.insert(name.clone(), child);
                }
            }
            Ok(node.into_tree_value())
        }
    }
}

fn parse_reserved(
    map: &Map<String, Value>,
    key: &str,
    at: &Path,
) -> Result<Option<Primitive>, TypeError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => Primitive::from_json(raw).map(Some).ok_or_else(|| {
            TypeError::InvalidExport {
                path: at.to_string(),
                reason: format!("{key} must be a primitive"),
            }
        }),
    }
}
