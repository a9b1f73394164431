//! Deterministic directory traversal
//!
//! Depth-first, entries sorted by file name, symbolic links never followed.
//! The sync engine relies on this order being stable between runs.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::Result;
use crate::config::WalkConfig;

/// Name-based skip rules shared by the walker and the top-level scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkFilter {
    hidden_marker: String,
    ignore: Vec<String>,
}

impl WalkFilter {
    pub fn new(hidden_marker: impl Into<String>, ignore: Vec<String>) -> Self {
        Self {
            hidden_marker: hidden_marker.into(),
            ignore,
        }
    }

    pub fn from_config(config: &WalkConfig) -> Self {
        Self::new(config.hidden_marker.clone(), config.ignore.clone())
    }

    /// Whether an entry with this name is skipped along with its subtree.
    pub fn skips(&self, name: &OsStr) -> bool {
        let name = name.to_string_lossy();
        (!self.hidden_marker.is_empty() && name.starts_with(self.hidden_marker.as_str()))
            || self.ignore.iter().any(|ignored| *ignored == name)
    }
}

impl Default for WalkFilter {
    fn default() -> Self {
        Self::from_config(&WalkConfig::default())
    }
}

/// A file or directory produced by [`Walker::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Restartable, lazy tree walker.
#[derive(Debug, Clone, Default)]
pub struct Walker {
    filter: WalkFilter,
}

impl Walker {
    pub fn new(filter: WalkFilter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &WalkFilter {
        &self.filter
    }

    /// Walk everything below `root`.
    ///
    /// The root itself is not produced unless it is a regular file, in which
    /// case it is the only entry. Symbolic links and other special files are
    /// dropped.
    pub fn walk<'a>(&'a self, root: &Path) -> impl Iterator<Item = Result<WalkEntry>> + 'a {
        let min_depth = if root.is_file() { 0 } else { 1 };

        WalkDir::new(root)
            .follow_links(false)
            .min_depth(min_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| entry.depth() == 0 || !self.filter.skips(entry.file_name()))
            .filter_map(|item| match item {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_dir() || file_type.is_file() {
                        Some(Ok(WalkEntry {
                            is_dir: file_type.is_dir(),
                            path: entry.into_path(),
                        }))
                    } else {
                        tracing::debug!(path = %entry.path().display(), "skipping special file");
                        None
                    }
                }
                Err(e) => Some(Err(e.into())),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(root: &Path, walker: &Walker) -> Vec<String> {
        walker
            .walk(root)
            .map(|e| {
                let e = e.unwrap();
                let rel = e.path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
                if e.is_dir { format!("{rel}/") } else { rel }
            })
            .collect()
    }

    #[test]
    fn depth_first_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::write(root.join("b/inner/z.txt"), "z").unwrap();
        fs::write(root.join("b/a.txt"), "a").unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("c.txt"), "c").unwrap();

        assert_eq!(
            names(root, &Walker::default()),
            ["a.txt", "b/", "b/a.txt", "b/inner/", "b/inner/z.txt", "c.txt"]
        );
    }

    #[test]
    fn hidden_and_ignored_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::write(root.join(".git/objects/x"), "x").unwrap();
        fs::write(root.join(".DS_Store"), "x").unwrap();
        fs::write(root.join("Thumbs.db"), "x").unwrap();
        fs::write(root.join("keep.txt"), "x").unwrap();

        assert_eq!(names(root, &Walker::default()), ["keep.txt"]);
    }

    #[test]
    fn file_root_yields_itself() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("single.bin");
        fs::write(&file, "x").unwrap();

        let entries: Vec<_> = Walker::default().walk(&file).map(|e| e.unwrap()).collect();
        assert_eq!(
            entries,
            [WalkEntry {
                path: file,
                is_dir: false
            }]
        );
    }

    #[test]
    fn walk_is_restartable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), "a").unwrap();
        let walker = Walker::default();
        assert_eq!(names(dir.path(), &walker), names(dir.path(), &walker));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let outside = dir.path().join("outside");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("secret.txt"), "x").unwrap();
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();
        fs::write(root.join("real.txt"), "x").unwrap();

        assert_eq!(names(&root, &Walker::default()), ["real.txt"]);
    }
}
