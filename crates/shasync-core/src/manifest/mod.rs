//! Checksum manifests
//!
//! A manifest maps manifest keys (`/dir/file`) to lowercase hex digests for one
//! synchronization root. Entries keep discovery order, which is what makes the
//! last entry a meaningful resume point.

mod format;
mod store;

pub use store::{ManifestForm, ManifestStore, Recovered};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use shasync_fs::checksum::normalize_digest;

/// One `path -> digest` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: String,
    pub digest: String,
}

impl ManifestEntry {
    /// Create an entry, normalizing the digest to lowercase.
    pub fn new(path: impl Into<String>, digest: &str) -> Self {
        Self {
            path: path.into(),
            digest: normalize_digest(digest),
        }
    }
}

/// Ordered mapping of manifest key to digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: IndexMap<String, String>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    /// Insert or update an entry.
    ///
    /// A new key goes to the end; an existing key keeps its position. Returns
    /// the previous digest, if any.
    pub fn insert(&mut self, entry: ManifestEntry) -> Option<String> {
        self.entries.insert(entry.path, entry.digest)
    }

    /// Overwrite the digest of an existing key. Returns `false` if the key is
    /// unknown, leaving the manifest untouched.
    pub fn set_digest(&mut self, path: &str, digest: &str) -> bool {
        match self.entries.get_mut(path) {
            Some(current) => {
                *current = normalize_digest(digest);
                true
            }
            None => false,
        }
    }

    /// Most recently discovered entry.
    pub fn last(&self) -> Option<ManifestEntry> {
        self.entries.last().map(|(path, digest)| ManifestEntry {
            path: path.clone(),
            digest: digest.clone(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl FromIterator<ManifestEntry> for Manifest {
    fn from_iter<I: IntoIterator<Item = ManifestEntry>>(iter: I) -> Self {
        let mut manifest = Manifest::new();
        for entry in iter {
            manifest.insert(entry);
        }
        manifest
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(path, digest)| ManifestEntry::new(path, digest))
            .collect()
    }
}
