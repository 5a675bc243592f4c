//! Storage key naming.
//!
//! Every cache entry is keyed `<namespace><kind>_<path>`:
//!
//! - `ofb_partial_/users/alice/name` -- one fragment
//! - `ofb_full_/users` -- `/users` was stored as a whole and can be restored
//!
//! The path part is the [`Path`] display form, so the root is `/`.

use std::fmt;

use ofb_types::Path;

/// Value of every `full` marker entry.
pub const FULL_SENTINEL: &str = "1";

/// The kind of a cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyKind {
    /// One flattened node.
    Partial,
    /// Marker for a completed store of a root.
    Full,
}

impl KeyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Partial => "partial",
            KeyKind::Full => "full",
        }
    }

    /// The key prefix shared by every entry of this kind.
    pub fn prefix(&self, namespace: &str) -> String {
        format!("{namespace}{}_", self.as_str())
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageKey {
    pub kind: KeyKind,
    pub path: Path,
}

impl StorageKey {
    pub fn partial(path: Path) -> Self {
        Self {
            kind: KeyKind::Partial,
            path,
        }
    }

    pub fn full(path: Path) -> Self {
        Self {
            kind: KeyKind::Full,
            path,
        }
    }

    /// The raw storage key under `namespace`.
    pub fn encode(&self, namespace: &str) -> String {
        format!("{}{}", self.kind.prefix(namespace), self.path)
    }

    /// Parse a raw storage key. Returns `None` for keys outside `namespace`
    /// or of an unknown kind.
    pub fn decode(namespace: &str, raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(namespace)?;
        let (kind, path) = if let Some(path) = rest.strip_prefix("partial_") {
            (KeyKind::Partial, path)
        } else if let Some(path) = rest.strip_prefix("full_") {
            (KeyKind::Full, path)
        } else {
            return None;
        };
        Some(Self {
            kind,
            path: Path::parse(path),
        })
    }
}

/// The raw-key prefix covering every `kind` entry at or beneath `root`.
///
/// This is a string prefix: it also matches sibling paths that merely share
/// leading characters (`/x` vs `/xy`). Callers filter decoded paths with
/// [`Path::starts_with`].
pub fn scan_prefix(namespace: &str, kind: KeyKind, root: &Path) -> String {
    if root.is_root() {
        format!("{}/", kind.prefix(namespace))
    } else {
        StorageKey {
            kind,
            path: root.clone(),
        }
        .encode(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_layout() {
        let key = StorageKey::partial(Path::parse("/x/b/c"));
        assert_eq!(key.encode("ofb_"), "ofb_partial_/x/b/c");
        assert_eq!(StorageKey::full(Path::parse("/x")).encode("ofb_"), "ofb_full_/x");
        assert_eq!(StorageKey::full(Path::root()).encode("ofb_"), "ofb_full_/");
    }

    #[test]
    fn decode_inverts_encode() {
        for key in [
            StorageKey::partial(Path::parse("/users/alice")),
            StorageKey::full(Path::root()),
        ] {
            assert_eq!(StorageKey::decode("ofb_", &key.encode("ofb_")), Some(key));
        }
    }

    #[test]
    fn decode_rejects_foreign_keys() {
        assert_eq!(StorageKey::decode("ofb_", "session_token"), None);
        assert_eq!(StorageKey::decode("ofb_", "ofb_other_/x"), None);
        assert_eq!(StorageKey::decode("app_", "ofb_full_/x"), None);
    }

    #[test]
    fn scan_prefix_for_root_covers_everything() {
        assert_eq!(scan_prefix("ofb_", KeyKind::Partial, &Path::root()), "ofb_partial_/");
        assert_eq!(scan_prefix("ofb_", KeyKind::Partial, &Path::parse("/x")), "ofb_partial_/x");
    }
}
