//! SyncEngine implementation
//!
//! Pushes every top-level item of a work directory to the remote host, one
//! manifest per item, resuming from whatever the manifest already records.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use shasync_fs::{ChecksumProvider, constants, manifest_key};

use crate::config::SyncConfig;
use crate::manifest::{ManifestEntry, ManifestForm, ManifestStore};
use crate::retry::RetryPolicy;
use crate::transfer::TransferProvider;
use crate::walker::{WalkFilter, Walker};
use crate::{Error, Result};

use super::context::SyncContext;

/// Lifecycle of a single file within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileState {
    /// Discovered, nothing done yet
    Pending,
    /// Being copied to the remote host
    InTransfer,
    /// Copied and digested locally
    Verified,
    /// Appended to the manifest (terminal)
    Recorded,
}

impl FileState {
    fn advance(&mut self, next: FileState, key: &str) {
        debug_assert!(
            matches!(
                (*self, next),
                (FileState::Pending, FileState::InTransfer)
                    | (FileState::Pending, FileState::Recorded)
                    | (FileState::InTransfer, FileState::Verified)
                    | (FileState::Verified, FileState::Recorded)
            ),
            "illegal transition {:?} -> {:?}",
            self,
            next
        );
        tracing::trace!(path = key, from = ?*self, to = ?next, "file state");
        *self = next;
    }
}

/// Outcome of syncing one top-level item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootReport {
    /// Top-level item name
    pub item: String,
    /// Manifest file for this item
    pub manifest: PathBuf,
    /// Last entry recorded before this run, if resuming
    pub resumed_after: Option<String>,
    /// Files copied and recorded in this run
    pub transferred: Vec<String>,
    /// Files already recorded by an earlier run
    pub skipped: usize,
    /// Remote directories ensured
    pub directories: usize,
}

/// Outcome of a whole `sync` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub roots: Vec<RootReport>,
}

impl SyncReport {
    pub fn transferred(&self) -> usize {
        self.roots.iter().map(|r| r.transferred.len()).sum()
    }

    pub fn skipped(&self) -> usize {
        self.roots.iter().map(|r| r.skipped).sum()
    }
}

/// Engine for pushing a work directory to the remote host
///
/// Execution is strictly sequential: one remote operation at a time, one
/// manifest append at a time.
pub struct SyncEngine<'a> {
    transfer: &'a dyn TransferProvider,
    checksum: &'a dyn ChecksumProvider,
    store: ManifestStore,
    walker: Walker,
    exclude_marker: String,
    retry: RetryPolicy,
    manifest_dir: PathBuf,
}

impl<'a> SyncEngine<'a> {
    /// Create a new SyncEngine from configuration and the two providers.
    pub fn new(
        config: &SyncConfig,
        transfer: &'a dyn TransferProvider,
        checksum: &'a dyn ChecksumProvider,
    ) -> Self {
        Self {
            transfer,
            checksum,
            store: ManifestStore::new(),
            walker: Walker::new(WalkFilter::from_config(&config.walk)),
            exclude_marker: config.walk.exclude_marker.clone(),
            retry: config.retry.policy(),
            manifest_dir: config.state.manifest_dir.clone(),
        }
    }

    /// Replace the manifest store (tests turn fsync off through this).
    pub fn with_store(mut self, store: ManifestStore) -> Self {
        self.store = store;
        self
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Path of the manifest that tracks a top-level item.
    pub fn manifest_path(&self, item: &str) -> PathBuf {
        self.manifest_dir.join(constants::sync_manifest_name(item))
    }

    /// Top-level items that will be synced, in sync order.
    pub fn top_level_items(&self, work_dir: &Path) -> Result<Vec<String>> {
        if !work_dir.is_dir() {
            return Err(Error::InvalidWorkDir {
                path: work_dir.to_path_buf(),
            });
        }

        let state_in_work_dir = same_dir(work_dir, &self.manifest_dir);
        let mut items = Vec::new();

        for entry in fs::read_dir(work_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let file_type = entry.file_type()?;
            let name_str = name.to_string_lossy().into_owned();

            if self.walker.filter().skips(&name) {
                continue;
            }
            if !self.exclude_marker.is_empty() && name_str.starts_with(&self.exclude_marker) {
                tracing::debug!(item = %name_str, "excluded by marker");
                continue;
            }
            if !(file_type.is_dir() || file_type.is_file()) {
                continue;
            }
            if state_in_work_dir && is_state_file(&name_str) {
                continue;
            }
            // Item names become manifest file names and remote paths
            items.push(key_for(work_dir, &entry.path())?.trim_start_matches('/').to_string());
        }

        items.sort();
        Ok(items)
    }

    /// Sync every top-level item of `work_dir`.
    ///
    /// Stops at the first item that fails; items already finished keep their
    /// sealed manifests and the failing one keeps every entry recorded
    /// before the failure.
    pub fn sync_all(&self, work_dir: &Path) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for item in self.top_level_items(work_dir)? {
            report.roots.push(self.sync_root(work_dir, &item)?);
        }
        Ok(report)
    }

    /// Sync one top-level item of `work_dir`.
    pub fn sync_root(&self, work_dir: &Path, item: &str) -> Result<RootReport> {
        let root = work_dir.join(item);
        let manifest_path = self.manifest_path(item);

        let recovered = self.store.recover(&manifest_path)?;
        if let Some(tail) = &recovered.dropped_tail {
            tracing::warn!(
                manifest = %manifest_path.display(),
                tail = tail.trim(),
                "dropping incomplete manifest entry"
            );
        }

        let mut ctx = SyncContext::from_recovered(&recovered);
        let mut writer = ManifestWriter::open(&self.store, &manifest_path, recovered.form)?;

        tracing::info!(
            item,
            recorded = ctx.manifest().len(),
            resume_after = ?ctx.resume_point().map(|e| e.path.as_str()),
            "syncing"
        );

        let mut report = RootReport {
            item: item.to_string(),
            manifest: manifest_path.clone(),
            resumed_after: ctx.resume_point().map(|e| e.path.clone()),
            transferred: Vec::new(),
            skipped: 0,
            directories: 0,
        };

        if root.is_dir() {
            self.ensure_remote_dir(work_dir, &root)?;
            report.directories += 1;
        }

        for entry in self.walker.walk(&root) {
            let entry = entry?;
            if entry.is_dir {
                self.ensure_remote_dir(work_dir, &entry.path)?;
                report.directories += 1;
            } else {
                self.sync_file(work_dir, &entry.path, &mut ctx, &mut writer, &mut report)?;
            }
        }

        writer.seal(&ctx)?;
        tracing::info!(
            item,
            transferred = report.transferred.len(),
            skipped = report.skipped,
            "item synced"
        );
        Ok(report)
    }

    fn ensure_remote_dir(&self, work_dir: &Path, dir: &Path) -> Result<()> {
        let key = key_for(work_dir, dir)?;
        tracing::debug!(remote = %key, "ensuring remote directory");
        self.retry
            .run(&key, || self.transfer.make_remote_dir(&key))
            .map_err(|source| Error::Transport { path: key.clone(), source })
    }

    fn sync_file(
        &self,
        work_dir: &Path,
        path: &Path,
        ctx: &mut SyncContext,
        writer: &mut ManifestWriter<'_>,
        report: &mut RootReport,
    ) -> Result<FileState> {
        let key = key_for(work_dir, path)?;
        let mut state = FileState::Pending;

        if ctx.is_done(&key) {
            tracing::debug!(path = %key, "already recorded");
            state.advance(FileState::Recorded, &key);
            report.skipped += 1;
            return Ok(state);
        }

        state.advance(FileState::InTransfer, &key);
        tracing::info!(path = %key, "transferring");
        self.retry
            .run(&key, || self.transfer.copy(path, &key))
            .map_err(|source| Error::Transport { path: key.clone(), source })?;

        let digest = self.checksum.digest(path).map_err(|source| Error::Checksum {
            path: path.to_path_buf(),
            source,
        })?;
        state.advance(FileState::Verified, &key);

        let entry = ManifestEntry::new(key.clone(), &digest);
        writer.append(&entry, ctx)?;
        ctx.record(entry);
        state.advance(FileState::Recorded, &key);

        report.transferred.push(key);
        Ok(state)
    }
}

/// Tracks what the manifest file looks like so appends never follow a
/// closing brace or a torn line.
struct ManifestWriter<'s> {
    store: &'s ManifestStore,
    path: PathBuf,
    form: ManifestForm,
}

impl<'s> ManifestWriter<'s> {
    fn open(store: &'s ManifestStore, path: &Path, form: ManifestForm) -> Result<Self> {
        let mut writer = Self {
            store,
            path: path.to_path_buf(),
            form,
        };
        if form == ManifestForm::Absent {
            // The manifest exists from the start of the run, even if empty
            store.reopen_log(path, &Default::default())?;
            writer.form = ManifestForm::Log;
        }
        Ok(writer)
    }

    fn append(&mut self, entry: &ManifestEntry, ctx: &SyncContext) -> Result<()> {
        if matches!(self.form, ManifestForm::Sealed | ManifestForm::TornLog) {
            self.store.reopen_log(&self.path, ctx.manifest())?;
            self.form = ManifestForm::Log;
        }
        self.store.append_entry(&self.path, entry)
    }

    /// Rewrite as a sealed document unless it already is one.
    fn seal(self, ctx: &SyncContext) -> Result<()> {
        if self.form == ManifestForm::Sealed {
            return Ok(());
        }
        self.store.rewrite_full(&self.path, ctx.manifest())
    }
}

fn key_for(work_dir: &Path, path: &Path) -> Result<String> {
    Ok(manifest_key(work_dir, path)?)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn is_state_file(name: &str) -> bool {
    (name.starts_with("sync-") && name.ends_with(".json"))
        || name == constants::StateFile::Config.as_str()
        || name == constants::StateFile::MismatchLog.as_str()
}
