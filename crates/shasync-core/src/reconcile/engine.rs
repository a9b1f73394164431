//! Reconciler implementation

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use shasync_fs::checksum::normalize_digest;
use shasync_fs::{ChecksumProvider, key_to_native, manifest_key, remote_join};

use crate::config::SyncConfig;
use crate::manifest::{Manifest, ManifestEntry, ManifestStore};
use crate::retry::RetryPolicy;
use crate::transfer::TransferProvider;
use crate::walker::{WalkFilter, Walker};
use crate::{Error, Result};

use super::compare::{Comparison, compare};
use super::mismatch_log::MismatchLog;

/// What to do about mismatched paths after a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReconcileMode {
    /// Report and write the mismatch log only
    ReportOnly,
    /// Copy the local file over the remote one
    Resync,
    /// Ask the remote host for a fresh digest and update the remote manifest
    Recheck,
    /// Resync, then recheck
    Both,
}

impl ReconcileMode {
    pub const ALL: [ReconcileMode; 4] = [
        ReconcileMode::ReportOnly,
        ReconcileMode::Resync,
        ReconcileMode::Recheck,
        ReconcileMode::Both,
    ];

    pub fn resyncs(self) -> bool {
        matches!(self, Self::Resync | Self::Both)
    }

    pub fn rechecks(self) -> bool {
        matches!(self, Self::Recheck | Self::Both)
    }

    /// Human description used by interactive prompts.
    pub fn describe(self) -> &'static str {
        match self {
            Self::ReportOnly => "Report only",
            Self::Resync => "Re-sync mismatched files",
            Self::Recheck => "Re-check remote checksums",
            Self::Both => "Re-sync, then re-check",
        }
    }
}

impl fmt::Display for ReconcileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReportOnly => "report",
            Self::Resync => "resync",
            Self::Recheck => "recheck",
            Self::Both => "both",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ReconcileMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "n" | "report" | "none" => Ok(Self::ReportOnly),
            "s" | "resync" => Ok(Self::Resync),
            "c" | "recheck" => Ok(Self::Recheck),
            "sc" | "both" => Ok(Self::Both),
            other => Err(Error::config(format!("unknown reconcile mode {other:?}"))),
        }
    }
}

/// Where mismatched paths live on each side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileTarget {
    /// Local directory the local manifest keys are relative to
    pub local_root: PathBuf,
    /// Remote directory (relative to the remote root) the keys are relative to
    pub remote_prefix: String,
}

/// Result of re-asking the remote host for one digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecheckOutcome {
    pub path: String,
    pub remote_digest: String,
    /// Whether the fresh remote digest now equals the local one
    pub matches: bool,
}

/// Everything a reconciliation run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub comparison: Comparison,
    /// Paths copied again
    pub resynced: Vec<String>,
    pub rechecked: Vec<RecheckOutcome>,
    /// Where the mismatch log was written, if it was
    pub mismatch_log: Option<PathBuf>,
    /// Whether the remote manifest was rewritten
    pub remote_rewritten: bool,
}

/// Builds comparison manifests and reconciles local against remote.
pub struct Reconciler<'a> {
    checksum: &'a dyn ChecksumProvider,
    transfer: Option<&'a dyn TransferProvider>,
    store: ManifestStore,
    walker: Walker,
    retry: RetryPolicy,
    mismatch_log: PathBuf,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler that can only work with local files.
    pub fn new(config: &SyncConfig, checksum: &'a dyn ChecksumProvider) -> Self {
        Self {
            checksum,
            transfer: None,
            store: ManifestStore::new(),
            walker: Walker::new(WalkFilter::from_config(&config.walk)),
            retry: config.retry.policy(),
            mismatch_log: config.state.mismatch_log.clone(),
        }
    }

    /// Attach a transfer provider, required by every mode but `ReportOnly`.
    pub fn with_transfer(mut self, transfer: &'a dyn TransferProvider) -> Self {
        self.transfer = Some(transfer);
        self
    }

    pub fn with_store(mut self, store: ManifestStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_mismatch_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.mismatch_log = path.into();
        self
    }

    /// Digest every file below `work_dir` and write a sealed manifest.
    pub fn generate(&self, work_dir: &Path, output: &Path) -> Result<Manifest> {
        if !work_dir.is_dir() {
            return Err(Error::InvalidWorkDir {
                path: work_dir.to_path_buf(),
            });
        }

        let mut manifest = Manifest::new();
        for entry in self.walker.walk(work_dir) {
            let entry = entry?;
            if entry.is_dir {
                continue;
            }
            let key = manifest_key(work_dir, &entry.path)?;
            let digest = self.local_digest(&entry.path)?;
            tracing::debug!(path = %key, digest = %digest, "digested");
            manifest.insert(ManifestEntry::new(key, &digest));
        }

        self.store.rewrite_full(output, &manifest)?;
        tracing::info!(
            output = %output.display(),
            entries = manifest.len(),
            "manifest generated"
        );
        Ok(manifest)
    }

    /// Recompute the digests of `paths` in an existing manifest.
    ///
    /// Every path is checked against the manifest before any file is read, so
    /// an unknown path leaves the manifest untouched.
    pub fn recheck(&self, work_dir: &Path, manifest_path: &Path, paths: &[String]) -> Result<Manifest> {
        let mut manifest = self.store.load(manifest_path)?;
        if let Some(unknown) = paths.iter().find(|p| !manifest.contains(p.as_str())) {
            return Err(Error::UnknownMismatchPath {
                path: unknown.clone(),
            });
        }

        for key in paths {
            let local = key_to_native(work_dir, key)?;
            let digest = self.local_digest(&local)?;
            if manifest.get(key) != Some(normalize_digest(&digest).as_str()) {
                tracing::info!(path = %key, digest = %digest, "digest changed");
            }
            manifest.set_digest(key, &digest);
        }

        self.store.rewrite_full(manifest_path, &manifest)?;
        Ok(manifest)
    }

    /// Compare a local manifest with a remote one and act on the mismatches.
    pub fn run(
        &self,
        local_path: &Path,
        remote_path: &Path,
        target: &ReconcileTarget,
        mode: ReconcileMode,
    ) -> Result<ReconcileReport> {
        let local = self.store.load(local_path)?;
        let mut remote = self.store.load(remote_path)?;

        let comparison = compare(&local, &remote)?;
        let mut report = ReconcileReport::default();

        if comparison.is_clean() {
            tracing::info!(entries = local.len(), "manifests match");
            report.comparison = comparison;
            return Ok(report);
        }

        if !comparison.mismatches.is_empty() {
            let log: MismatchLog = comparison.mismatch_paths().into_iter().collect();
            log.save(&self.mismatch_log, Default::default())?;
            tracing::info!(
                log = %self.mismatch_log.display(),
                count = log.paths().len(),
                "mismatch log written"
            );
            report.mismatch_log = Some(self.mismatch_log.clone());
        }

        let transfer = match (mode, self.transfer) {
            (ReconcileMode::ReportOnly, _) => None,
            (_, Some(transfer)) => Some(transfer),
            (_, None) => {
                return Err(Error::config(format!(
                    "reconcile mode `{mode}` needs a remote connection"
                )));
            }
        };

        if let Some(transfer) = transfer {
            let repaired = self.repair(transfer, target, mode, &comparison, &mut remote, &mut report);
            // Digests fetched before a failure are kept
            if report.remote_rewritten {
                self.store.rewrite_full(remote_path, &remote)?;
            }
            repaired?;
        }

        report.comparison = comparison;
        Ok(report)
    }

    fn repair(
        &self,
        transfer: &dyn TransferProvider,
        target: &ReconcileTarget,
        mode: ReconcileMode,
        comparison: &Comparison,
        remote: &mut Manifest,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        for record in &comparison.mismatches {
            let remote_rel = remote_join(&target.remote_prefix, &record.path);

            if mode.resyncs() {
                let local_file = key_to_native(&target.local_root, &record.path)?;
                tracing::info!(path = %record.path, remote = %remote_rel, "re-syncing");
                self.retry
                    .run(&remote_rel, || transfer.copy(&local_file, &remote_rel))
                    .map_err(|source| Error::Transport {
                        path: remote_rel.clone(),
                        source,
                    })?;
                report.resynced.push(record.path.clone());
            }

            if mode.rechecks() {
                let digest = self
                    .retry
                    .run(&remote_rel, || transfer.remote_digest(&remote_rel))
                    .map_err(|source| Error::Transport {
                        path: remote_rel.clone(),
                        source,
                    })?;
                let digest = normalize_digest(&digest);
                remote.set_digest(&record.path, &digest);
                report.remote_rewritten = true;

                let matches = digest == record.local_digest;
                if !matches {
                    tracing::warn!(
                        path = %record.path,
                        local = %record.local_digest,
                        remote = %digest,
                        "remote checksum still differs"
                    );
                }
                report.rechecked.push(RecheckOutcome {
                    path: record.path.clone(),
                    remote_digest: digest,
                    matches,
                });
            }
        }
        Ok(())
    }

    fn local_digest(&self, path: &Path) -> Result<String> {
        self.checksum.digest(path).map_err(|source| Error::Checksum {
            path: path.to_path_buf(),
            source,
        })
    }
}
