//! SHA-256 checksum utilities
//!
//! Digests are bare lowercase hex (64 characters), the same text `shasum -a 256`
//! and `sha256sum` print, so local and remote digests compare as plain strings.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::{Error, Result};

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Computes the content digest of a file.
///
/// The sync and reconciliation engines only see this trait, so tests can
/// substitute a deterministic double.
pub trait ChecksumProvider {
    /// Digest of the file at `path` as 64 lowercase hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Checksum`] if the file cannot be read.
    fn digest(&self, path: &Path) -> Result<String>;
}

/// Streaming SHA-256 over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Checksum;

impl ChecksumProvider for Sha256Checksum {
    fn digest(&self, path: &Path) -> Result<String> {
        compute_file_checksum(path)
    }
}

/// Compute the SHA-256 checksum of in-memory content.
pub fn compute_content_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Compute the SHA-256 checksum of a file's contents without loading it whole.
///
/// # Errors
///
/// Returns [`Error::Checksum`] if the file cannot be opened or read.
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    let checksum_err = |source| Error::Checksum {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(checksum_err)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    std::io::copy(&mut reader, &mut hasher).map_err(checksum_err)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Whether `value` looks like a hex SHA-256 digest (either case).
pub fn is_digest(value: &str) -> bool {
    value.len() == DIGEST_HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Canonical form used for comparisons and persistence.
pub fn normalize_digest(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

/// Extract the digest from `sha256sum`/`shasum` output (`<hex>  <path>`).
///
/// Returns `None` when the first token is not a digest.
pub fn parse_sum_output(output: &str) -> Option<String> {
    let token = output.split_whitespace().next()?;
    is_digest(token).then(|| normalize_digest(token))
}
