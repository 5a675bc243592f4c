//! Database locations.
//!
//! A [`Path`] is an ordered list of segment names. The textual form is
//! `/`-delimited with a leading slash (`/users/alice`); the root path has zero
//! segments and renders as `/`. Empty segments are ignored when parsing, so
//! `"users//alice/"` and `"/users/alice"` name the same location.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A location in the tree, as an ordered sequence of segments.
///
/// Ordering is segment-wise lexicographic, which keeps every path directly
/// followed by its descendants when paths are sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The root path (zero segments).
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a `/`-delimited path string.
    ///
    /// No validation is performed beyond dropping empty segments.
    pub fn parse(s: &str) -> Self {
        Self {
            segments: s
                .split('/')
                .filter(|seg| !seg.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Build a path from pre-split segments. Empty segments are dropped.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments
                .into_iter()
                .map(Into::into)
                .filter(|seg: &String| !seg.is_empty())
                .collect(),
        }
    }

    /// The segments of this path.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments. The root has depth 0.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The final segment, or `None` for the root.
    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The location of a child. `name` may itself contain `/`, in which case
    /// every component is appended.
    pub fn child(&self, name: &str) -> Self {
        self.join(&Path::parse(name))
    }

    /// Append all segments of `relative` to this path.
    pub fn join(&self, relative: &Path) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        Self { segments }
    }

    /// The parent location, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Returns `true` if `self` equals `prefix` or lies beneath it.
    ///
    /// Matching is by whole segments: `/xy` does not start with `/x`.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Returns `true` if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        other.depth() > self.depth() && other.starts_with(self)
    }

    /// The part of `self` below `prefix`, or `None` if `self` is not at or
    /// beneath `prefix`.
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Self> {
        if !self.starts_with(prefix) {
            return None;
        }
        Some(Self {
            segments: self.segments[prefix.depth()..].to_vec(),
        })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for seg in &self.segments {
            write!(f, "/{seg}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::parse(&s)
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}
