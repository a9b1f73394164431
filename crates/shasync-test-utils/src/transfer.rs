//! [`ScriptedTransfer`], an in-memory stand-in for the remote host.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use shasync_core::{TransferProvider, TransportError};
use shasync_fs::checksum::compute_file_checksum;
use shasync_fs::key_to_native;

/// One call made against the transfer provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Copy { local: PathBuf, remote: String },
    MakeDir(String),
    Digest(String),
}

/// Records every call and fails on demand.
///
/// Failures are queued per remote path and consumed one per call, so
/// `fail(path, transient)` followed by a retry models a dropped connection that
/// recovers. With [`ScriptedTransfer::mirror_into`] successful copies are
/// written to a local directory standing in for the remote root.
#[derive(Debug, Default)]
pub struct ScriptedTransfer {
    calls: RefCell<Vec<Call>>,
    failures: RefCell<HashMap<String, VecDeque<TransportError>>>,
    digests: HashMap<String, String>,
    mirror: Option<PathBuf>,
}

impl ScriptedTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write successful copies below `dir`.
    pub fn mirror_into(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mirror = Some(dir.into());
        self
    }

    /// Answer `remote_digest(remote)` with `digest`.
    pub fn with_digest(mut self, remote: &str, digest: &str) -> Self {
        self.digests.insert(remote.to_string(), digest.to_string());
        self
    }

    /// Queue a failure for the next call that targets `remote`.
    pub fn fail(&self, remote: &str, error: TransportError) {
        self.failures
            .borrow_mut()
            .entry(remote.to_string())
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Remote paths passed to `copy`, in call order (retries included).
    pub fn copies(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Copy { remote, .. } => Some(remote.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn dirs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::MakeDir(remote) => Some(remote.clone()),
                _ => None,
            })
            .collect()
    }

    fn scripted_failure(&self, remote: &str) -> Result<(), TransportError> {
        match self
            .failures
            .borrow_mut()
            .get_mut(remote)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn mirror_path(&self, remote: &str) -> Result<Option<PathBuf>, TransportError> {
        match &self.mirror {
            Some(dir) => key_to_native(dir, remote)
                .map(Some)
                .map_err(|e| TransportError::permanent(e.to_string())),
            None => Ok(None),
        }
    }
}

impl TransferProvider for ScriptedTransfer {
    fn copy(&self, local: &Path, remote: &str) -> Result<(), TransportError> {
        self.calls.borrow_mut().push(Call::Copy {
            local: local.to_path_buf(),
            remote: remote.to_string(),
        });
        self.scripted_failure(remote)?;

        if let Some(target) = self.mirror_path(remote)? {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| TransportError::permanent(e.to_string()))?;
            }
            fs::copy(local, &target).map_err(|e| TransportError::permanent(e.to_string()))?;
        }
        Ok(())
    }

    fn make_remote_dir(&self, remote: &str) -> Result<(), TransportError> {
        self.calls.borrow_mut().push(Call::MakeDir(remote.to_string()));
        self.scripted_failure(remote)?;

        if let Some(target) = self.mirror_path(remote)? {
            fs::create_dir_all(target).map_err(|e| TransportError::permanent(e.to_string()))?;
        }
        Ok(())
    }

    fn remote_digest(&self, remote: &str) -> Result<String, TransportError> {
        self.calls.borrow_mut().push(Call::Digest(remote.to_string()));
        self.scripted_failure(remote)?;

        if let Some(digest) = self.digests.get(remote) {
            return Ok(digest.clone());
        }
        match self.mirror_path(remote)? {
            Some(target) => {
                compute_file_checksum(&target).map_err(|e| TransportError::permanent(e.to_string()))
            }
            None => Err(TransportError::permanent(format!("no digest scripted for {remote}"))),
        }
    }
}
