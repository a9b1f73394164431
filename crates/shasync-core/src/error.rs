//! Error types for shasync-core

use std::path::PathBuf;

use crate::transfer::TransportError;

/// Result type for shasync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shasync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Persisted manifest is not a well-formed mapping
    #[error("Corrupt manifest at {path}: {reason}")]
    CorruptManifest { path: PathBuf, reason: String },

    /// The two manifests of a comparison differ in size
    #[error("Remote is missing some entries. Local: {local}, remote: {remote}")]
    EntryCountMismatch { local: usize, remote: usize },

    /// Transfer provider failed and the retry budget is exhausted (or the
    /// failure was permanent)
    #[error("Transfer of {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: TransportError,
    },

    /// The local digest could not be computed
    #[error("Checksum failed for {path}: {source}")]
    Checksum {
        path: PathBuf,
        #[source]
        source: shasync_fs::Error,
    },

    /// A targeted re-check named a path the manifest does not contain
    #[error("Mismatch path {path} does not exist in the manifest")]
    UnknownMismatchPath { path: String },

    /// Directory traversal failed
    #[error("Failed to walk directory tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// Work directory is missing or not a directory
    #[error("Invalid work directory: {path}")]
    InvalidWorkDir { path: PathBuf },

    /// Configuration is incomplete for the requested operation
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from shasync-fs
    #[error(transparent)]
    Fs(#[from] shasync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptManifest {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
