//! Manifest comparison

use serde::Serialize;
use shasync_fs::checksum::normalize_digest;

use crate::manifest::Manifest;
use crate::{Error, Result};

/// A path present on both sides with different digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MismatchRecord {
    pub path: String,
    pub local_digest: String,
    pub remote_digest: String,
}

/// Result of comparing a local manifest against a remote one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    /// Local paths with no remote entry, in local order
    pub missing: Vec<String>,
    /// Paths whose digests differ, in local order
    pub mismatches: Vec<MismatchRecord>,
}

impl Comparison {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.mismatches.is_empty()
    }

    pub fn mismatch_paths(&self) -> Vec<String> {
        self.mismatches.iter().map(|m| m.path.clone()).collect()
    }
}

/// Compare two manifests entry by entry.
///
/// Both sides must hold the same number of entries, otherwise
/// [`Error::EntryCountMismatch`] is returned before any entry is looked at.
/// Only local keys are checked; a key that exists on the remote side alone is
/// never reported.
pub fn compare(local: &Manifest, remote: &Manifest) -> Result<Comparison> {
    if local.len() != remote.len() {
        return Err(Error::EntryCountMismatch {
            local: local.len(),
            remote: remote.len(),
        });
    }

    let mut comparison = Comparison::default();
    for (path, local_digest) in local.iter() {
        match remote.get(path) {
            None => {
                tracing::warn!(path, "missing on remote");
                comparison.missing.push(path.to_string());
            }
            Some(remote_digest) if normalize_digest(remote_digest) != normalize_digest(local_digest) => {
                tracing::warn!(path, local = local_digest, remote = remote_digest, "checksum mismatch");
                comparison.mismatches.push(MismatchRecord {
                    path: path.to_string(),
                    local_digest: local_digest.to_string(),
                    remote_digest: remote_digest.to_string(),
                });
            }
            Some(_) => {}
        }
    }

    Ok(comparison)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn manifest(entries: &[(&str, &str)]) -> Manifest {
        entries.iter().copied().collect()
    }

    #[test]
    fn identical_manifests_are_clean() {
        let m = manifest(&[("/a", "1"), ("/b", "2")]);
        assert!(compare(&m, &m).unwrap().is_clean());
    }

    #[test]
    fn digest_difference_is_reported() {
        let local = manifest(&[("/a.txt", "d1"), ("/b.txt", "d2")]);
        let remote = manifest(&[("/a.txt", "d1"), ("/b.txt", "dX")]);

        let comparison = compare(&local, &remote).unwrap();
        assert_eq!(
            comparison.mismatches,
            [MismatchRecord {
                path: "/b.txt".into(),
                local_digest: "d2".into(),
                remote_digest: "dx".into(),
            }]
        );
        assert_eq!(comparison.mismatch_paths(), ["/b.txt"]);
        assert!(comparison.missing.is_empty());
    }

    #[test]
    fn case_only_difference_is_not_a_mismatch() {
        let local = manifest(&[("/a", "ABCDEF")]);
        let remote = manifest(&[("/a", "abcdef")]);
        assert!(compare(&local, &remote).unwrap().is_clean());
    }

    #[test]
    fn count_mismatch_fails_first() {
        let local = manifest(&[("/a", "1"), ("/b", "2"), ("/c", "3")]);
        let remote = manifest(&[("/a", "1"), ("/b", "2")]);
        match compare(&local, &remote) {
            Err(Error::EntryCountMismatch { local, remote }) => {
                assert_eq!((local, remote), (3, 2));
            }
            other => panic!("expected count mismatch, got {other:?}"),
        }
    }

    #[test]
    fn remote_only_keys_are_not_reported() {
        let local = manifest(&[("/a", "1"), ("/b", "2")]);
        let remote = manifest(&[("/a", "1"), ("/z", "9")]);

        let comparison = compare(&local, &remote).unwrap();
        assert_eq!(comparison.missing, ["/b"]);
        assert!(comparison.mismatches.is_empty());
    }
}
