//! Hierarchical node path identifiers.
//!
//! A [`NodePath`] addresses one node of the server-rendered tree. Paths are
//! assigned by the server and are opaque to the client beyond equality and
//! prefix semantics: segments are joined by `_`, and the first segment of
//! every in-tree path is the root container sentinel.
//!
//! Two sentinel paths are reserved:
//!
//! - `"0"` — the top-level host object (window),
//! - `"1"` — the root container of the rendered tree.
//!
//! # Example
//!
//! ```
//! use livepage_path::NodePath;
//!
//! let path = NodePath::parse("1_2_1").unwrap();
//! assert_eq!(path.parent(), Some(NodePath::parse("1_2").unwrap()));
//! assert_eq!(path.child(3).as_str(), "1_2_1_3");
//! assert!(NodePath::root().is_ancestor_of(&path));
//! assert!(!path.is_window());
//! ```

use std::fmt;

use thiserror::Error;

/// Separator between path segments.
pub const SEPARATOR: char = '_';

/// Sentinel path of the top-level host object (window).
pub const WINDOW_PATH: &str = "0";

/// Sentinel path of the root container.
pub const ROOT_PATH: &str = "1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("empty node path")]
    Empty,
    #[error("invalid node path segment in {0:?}")]
    InvalidSegment(String),
}

/// A hierarchical node path such as `"1_2_1"`.
///
/// Ordered and hashable so it can key registry and listener tables.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath(String);

impl NodePath {
    /// Parses a path string, validating that every segment is a
    /// non-empty decimal number.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        for segment in s.split(SEPARATOR) {
            if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                return Err(PathError::InvalidSegment(s.to_string()));
            }
        }
        Ok(NodePath(s.to_string()))
    }

    /// The window sentinel path, `"0"`.
    pub fn window() -> Self {
        NodePath(WINDOW_PATH.to_string())
    }

    /// The root container sentinel path, `"1"`.
    pub fn root() -> Self {
        NodePath(ROOT_PATH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_window(&self) -> bool {
        self.0 == WINDOW_PATH
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_PATH
    }

    /// Number of segments.
    pub fn level(&self) -> usize {
        self.0.split(SEPARATOR).count()
    }

    /// The parent path, or `None` for a single-segment path.
    pub fn parent(&self) -> Option<NodePath> {
        self.0
            .rfind(SEPARATOR)
            .map(|idx| NodePath(self.0[..idx].to_string()))
    }

    /// Appends a child segment.
    pub fn child(&self, index: u32) -> NodePath {
        let mut s = String::with_capacity(self.0.len() + 4);
        s.push_str(&self.0);
        s.push(SEPARATOR);
        s.push_str(&index.to_string());
        NodePath(s)
    }

    /// True if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == SEPARATOR as u8
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_segmented_paths() {
        assert_eq!(NodePath::parse("1").unwrap().as_str(), "1");
        assert_eq!(NodePath::parse("1_2_10").unwrap().level(), 3);
    }

    #[test]
    fn parse_rejects_empty_and_malformed() {
        assert_eq!(NodePath::parse(""), Err(PathError::Empty));
        assert!(matches!(
            NodePath::parse("1__2"),
            Err(PathError::InvalidSegment(_))
        ));
        assert!(matches!(
            NodePath::parse("1_a"),
            Err(PathError::InvalidSegment(_))
        ));
        assert!(matches!(
            NodePath::parse("1_2_"),
            Err(PathError::InvalidSegment(_))
        ));
    }

    #[test]
    fn sentinels() {
        assert!(NodePath::window().is_window());
        assert!(NodePath::root().is_root());
        assert!(!NodePath::root().is_window());
    }

    #[test]
    fn parent_and_child_are_inverse() {
        let p = NodePath::parse("1_2").unwrap();
        assert_eq!(p.child(1).parent(), Some(p.clone()));
        assert_eq!(NodePath::root().parent(), None);
    }

    #[test]
    fn ancestor_respects_segment_boundaries() {
        let a = NodePath::parse("1_2").unwrap();
        let b = NodePath::parse("1_2_1").unwrap();
        let c = NodePath::parse("1_22").unwrap();
        assert!(a.is_ancestor_of(&b));
        assert!(!a.is_ancestor_of(&c));
        assert!(!a.is_ancestor_of(&a));
    }
}
