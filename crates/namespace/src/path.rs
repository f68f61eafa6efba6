//! Hierarchical namespace paths and the `(table, key)` mapping rule.
//!
//! Every path handed to a remote call comes from [`map_path`], except the
//! session-scoped constants declared here (the default working directory and the
//! self-check probe).
//!
//! Separator characters embedded in a table or key are **not** escaped. They
//! change the depth of the resulting path; keeping them out is the caller's
//! responsibility.

use serde::{Deserialize, Serialize};

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Directory created at session open as the implicit container for table paths.
pub const DEFAULT_DIRECTORY: &str = "/usertable";

/// Directory holding the self-check probe file.
pub const PROBE_DIRECTORY: &str = "/nsbench_probe";

/// File whose status is looked up by the self-check.
pub const PROBE_FILE: &str = "/nsbench_probe/status_probe";

/// An absolute path identifying one node of the namespace tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespacePath(String);

impl NamespacePath {
    /// The root of the namespace.
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    /// The session's default working directory ([`DEFAULT_DIRECTORY`]).
    pub fn default_directory() -> Self {
        Self(DEFAULT_DIRECTORY.to_string())
    }

    /// The self-check probe directory ([`PROBE_DIRECTORY`]).
    pub fn probe_directory() -> Self {
        Self(PROBE_DIRECTORY.to_string())
    }

    /// The self-check probe file ([`PROBE_FILE`]).
    pub fn probe_file() -> Self {
        Self(PROBE_FILE.to_string())
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the namespace root.
    pub fn is_root(&self) -> bool {
        self.0.len() == 1 && self.0.starts_with(SEPARATOR)
    }

    /// Iterates the segments below the root, in order.
    ///
    /// Empty segments produced by doubled separators are yielded as-is.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        let body = self.0.strip_prefix(SEPARATOR).unwrap_or(&self.0);
        body.split(SEPARATOR).filter(move |_| !body.is_empty())
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit(SEPARATOR).next()
    }

    /// Path of the enclosing directory, or `None` for the root.
    pub fn parent(&self) -> Option<NamespacePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Returns `true` if `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &NamespacePath) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }
        self.0
            .strip_prefix(ancestor.as_str())
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    }
}

impl std::fmt::Display for NamespacePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps a benchmark `(table, key)` pair onto its namespace path.
///
/// Produces `/{table}/{key}`. Total and pure; inputs are not validated or escaped.
pub fn map_path(table: &str, key: &str) -> NamespacePath {
    let mut path = String::with_capacity(table.len() + key.len() + 2);
    path.push(SEPARATOR);
    path.push_str(table);
    path.push(SEPARATOR);
    path.push_str(key);
    NamespacePath(path)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn maps_table_and_key_to_absolute_path() {
        assert_eq!(map_path("usertable", "user1").as_str(), "/usertable/user1");
    }

    #[test]
    fn distinct_pairs_map_to_distinct_paths() {
        let tables = ["usertable", "t", "users", ""];
        let keys = ["user1", "user10", "k", ""];
        let mut seen = HashSet::new();
        for table in tables {
            for key in keys {
                assert!(seen.insert(map_path(table, key)), "collision for ({table}, {key})");
            }
        }
        assert_eq!(seen.len(), tables.len() * keys.len());
    }

    #[test]
    fn embedded_separator_changes_depth() {
        assert_eq!(map_path("usertable", "user1").depth(), 2);
        let deep = map_path("a/b", "c");
        assert_eq!(deep.as_str(), "/a/b/c");
        assert_eq!(deep.depth(), 3);
        // Same path as a different, separator-free pair would produce.
        assert_eq!(map_path("a/b", "c"), map_path("a", "b/c"));
    }

    #[test]
    fn empty_inputs_still_produce_a_path() {
        assert_eq!(map_path("", "").as_str(), "//");
        assert_eq!(map_path("", "k").as_str(), "//k");
    }

    #[test]
    fn parent_and_name_walk_the_hierarchy() {
        let path = map_path("usertable", "user1");
        assert_eq!(path.name(), Some("user1"));
        let parent = path.parent().unwrap();
        assert_eq!(parent, NamespacePath::default_directory());
        assert_eq!(parent.parent(), Some(NamespacePath::root()));
        assert_eq!(NamespacePath::root().parent(), None);
        assert_eq!(NamespacePath::root().name(), None);
    }

    #[test]
    fn descendant_check_respects_segment_boundaries() {
        let dir = NamespacePath::default_directory();
        assert!(map_path("usertable", "x").is_descendant_of(&dir));
        assert!(!map_path("usertable2", "x").is_descendant_of(&dir));
        assert!(!dir.is_descendant_of(&dir));
        assert!(dir.is_descendant_of(&NamespacePath::root()));
    }

    #[test]
    fn probe_file_lives_in_probe_directory() {
        assert_eq!(
            NamespacePath::probe_file().parent(),
            Some(NamespacePath::probe_directory())
        );
    }
}
