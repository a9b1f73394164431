//! Runtime configuration
//!
//! Every field has a default, so an empty or missing `shasync.toml` yields a
//! usable configuration for local-only operations. Remote settings are only
//! required by commands that talk to the remote host.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shasync_fs::constants::{DEFAULT_IGNORE, EXCLUDE_MARKER, HIDDEN_MARKER};
use shasync_fs::{ConfigStore, NormalizedPath, StateFile};

use crate::retry::RetryPolicy;
use crate::{Error, Result};

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub remote: Option<RemoteConfig>,
    pub walk: WalkConfig,
    pub retry: RetryConfig,
    pub state: StateConfig,
}

/// Where and how to reach the remote host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// `user@host` or an ssh config alias
    pub host: String,
    /// Remote directory that mirrors the local work directory
    pub root: String,
    /// Private key passed with `-i`; `~/` is expanded
    #[serde(default)]
    pub identity: Option<PathBuf>,
    #[serde(default)]
    pub port: Option<u16>,
}

impl RemoteConfig {
    /// Identity file with a leading `~/` resolved against the home directory.
    pub fn identity_path(&self) -> Option<PathBuf> {
        self.identity.as_deref().map(expand_home)
    }
}

/// Which entries the walker skips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Entries whose name starts with this are skipped everywhere
    pub hidden_marker: String,
    /// Top-level items whose name starts with this are not synced
    pub exclude_marker: String,
    /// Exact names skipped everywhere
    pub ignore: Vec<String>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            hidden_marker: HIDDEN_MARKER.to_string(),
            exclude_marker: EXCLUDE_MARKER.to_string(),
            ignore: DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub retries: u32,
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            retries: policy.retries,
            delay_secs: policy.delay.as_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            delay: Duration::from_secs(self.delay_secs),
        }
    }
}

/// Where manifests and the mismatch log live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub manifest_dir: PathBuf,
    pub mismatch_log: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            manifest_dir: PathBuf::from("."),
            mismatch_log: PathBuf::from(StateFile::MismatchLog.as_str()),
        }
    }
}

impl SyncConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `shasync.toml` in the current
    /// directory is used when present and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let store = ConfigStore::new();
        let config: SyncConfig = match path {
            Some(path) => store.load(&NormalizedPath::new(path))?,
            None => store.load_or_default(&NormalizedPath::new(StateFile::Config.as_str()))?,
        };
        Ok(config)
    }

    /// Remote settings, or a configuration error naming the operation that
    /// needed them.
    pub fn require_remote(&self, operation: &str) -> Result<&RemoteConfig> {
        self.remote.as_ref().ok_or_else(|| {
            Error::config(format!(
                "{operation} needs a [remote] section with `host` and `root`"
            ))
        })
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
