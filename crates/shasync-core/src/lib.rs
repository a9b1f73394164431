//! Core engines for shasync
//!
//! Holds the manifest store, the resumable sync engine and the reconciliation
//! engine. Nothing here talks to a remote host directly: the engines go
//! through [`TransferProvider`] and [`shasync_fs::ChecksumProvider`], which
//! the CLI implements over SSH.

pub mod config;
pub mod error;
pub mod manifest;
pub mod reconcile;
pub mod retry;
pub mod sync;
pub mod transfer;
pub mod walker;

pub use config::{RemoteConfig, SyncConfig};
pub use error::{Error, Result};
pub use manifest::{Manifest, ManifestEntry, ManifestForm, ManifestStore};
pub use reconcile::{Comparison, MismatchLog, MismatchRecord, ReconcileMode, ReconcileReport, ReconcileTarget, Reconciler};
pub use retry::RetryPolicy;
pub use sync::{SyncContext, SyncEngine, SyncReport};
pub use transfer::{TransferProvider, TransportError, TransportErrorKind};
pub use walker::{WalkFilter, Walker};
