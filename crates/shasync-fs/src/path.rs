//! Normalized path handling and manifest keys
//!
//! Manifest keys are the work-directory-relative path of a file, written with
//! forward slashes and always starting with `/` (for example `/2023/06/a.mp4`).
//! Keys are converted back to native paths only at I/O boundaries.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// A path normalized to use forward slashes internally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    ///
    /// Backslashes are separators only on Windows; elsewhere they are
    /// ordinary file name characters and are kept.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        Self {
            inner: normalize_separators(&path_str),
        }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Get the extension of the last component if present.
    pub fn extension(&self) -> Option<&str> {
        let name = self.inner.trim_end_matches('/').rsplit('/').next()?;
        let idx = name.rfind('.')?;
        if idx == 0 { None } else { Some(&name[idx + 1..]) }
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

#[cfg(windows)]
fn normalize_separators(s: &str) -> String {
    s.replace('\\', "/")
}

#[cfg(not(windows))]
fn normalize_separators(s: &str) -> String {
    s.to_string()
}

#[cfg(windows)]
fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

#[cfg(not(windows))]
fn is_separator(c: char) -> bool {
    c == '/'
}

/// Manifest key of `path` relative to `root`.
///
/// Fails when `path` is not below `root`, equals it, or has a component that
/// is not valid UTF-8. Two distinct non-UTF-8 names would otherwise collapse
/// onto the same key.
pub fn manifest_key(root: &Path, path: &Path) -> Result<String> {
    let invalid = |reason| Error::InvalidKey {
        key: path.to_string_lossy().into_owned(),
        reason,
    };

    let relative = path
        .strip_prefix(root)
        .map_err(|_| invalid("path is not below the root"))?;
    let mut key = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| invalid("file name is not valid UTF-8"))?;
                key.push('/');
                key.push_str(part);
            }
            Component::CurDir => {}
            _ => return Err(invalid("path is not below the root")),
        }
    }

    if key.is_empty() {
        return Err(invalid("path is the root itself"));
    }
    Ok(key)
}

/// Native path of a manifest key under `root`.
///
/// Keys are accepted with or without the leading `/` (and with `\\` as a
/// separator on Windows). Empty keys and keys containing `..` are rejected so a key can
/// never address a file outside `root`.
pub fn key_to_native(root: &Path, key: &str) -> Result<PathBuf> {
    let invalid = |reason| Error::InvalidKey {
        key: key.to_string(),
        reason,
    };

    let mut path = root.to_path_buf();
    let mut segments = 0usize;
    for segment in key.split(is_separator) {
        match segment {
            "" | "." => {}
            ".." => return Err(invalid("parent directory segments are not allowed")),
            part => {
                path.push(part);
                segments += 1;
            }
        }
    }

    if segments == 0 {
        return Err(invalid("key does not name a file"));
    }
    Ok(path)
}

/// Remote-relative path of a key under a remote prefix (`"2023"` + `"/a.mp4"`).
pub fn remote_join(prefix: &str, key: &str) -> String {
    let prefix = normalize_separators(prefix);
    let prefix = prefix.trim_matches('/');
    let key = normalize_separators(key);
    let key = key.trim_start_matches('/');
    if prefix.is_empty() {
        format!("/{key}")
    } else {
        format!("/{prefix}/{key}")
    }
}
