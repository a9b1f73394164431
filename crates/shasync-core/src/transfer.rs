//! Transfer provider boundary
//!
//! The engines never talk to `scp`/`ssh` directly. Everything that touches the
//! remote host goes through [`TransferProvider`], which the CLI implements
//! over SSH and tests implement in memory.

use std::fmt;
use std::path::Path;

/// Whether a transport failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Network drop, reconnect, timeout
    Transient,
    /// Missing binary, bad credentials, malformed reply
    Permanent,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// Failure reported by a [`TransferProvider`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} transport error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == TransportErrorKind::Transient
    }
}

/// Copies files to the remote host and runs the few remote commands the
/// engines need.
///
/// Remote paths are manifest-key shaped (`/dir/file`) and relative to the
/// provider's configured remote root. Calls block until the remote side has
/// finished.
pub trait TransferProvider {
    /// Copy a local file to `remote`, overwriting it.
    fn copy(&self, local: &Path, remote: &str) -> Result<(), TransportError>;

    /// Create `remote` and any missing parents (`mkdir -p`).
    fn make_remote_dir(&self, remote: &str) -> Result<(), TransportError>;

    /// Digest of `remote` computed on the remote host.
    fn remote_digest(&self, remote: &str) -> Result<String, TransportError>;
}

impl<T: TransferProvider + ?Sized> TransferProvider for &T {
    fn copy(&self, local: &Path, remote: &str) -> Result<(), TransportError> {
        (**self).copy(local, remote)
    }

    fn make_remote_dir(&self, remote: &str) -> Result<(), TransportError> {
        (**self).make_remote_dir(remote)
    }

    fn remote_digest(&self, remote: &str) -> Result<String, TransportError> {
        (**self).remote_digest(remote)
    }
}
