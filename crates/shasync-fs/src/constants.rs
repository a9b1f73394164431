//! Naming conventions for files shasync keeps next to the work directory.

use std::path::Path;

/// Marker prefix of hidden entries, never synced or checksummed.
pub const HIDDEN_MARKER: &str = ".";

/// Marker prefix of top-level items excluded from `sync`.
pub const EXCLUDE_MARKER: &str = "_";

/// OS metadata files skipped wherever they appear.
pub const DEFAULT_IGNORE: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// Well-known state files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateFile {
    /// Default configuration file looked up in the current directory
    Config,
    /// Paths needing a re-check, written by `compare`
    MismatchLog,
}

impl StateFile {
    /// Get the string representation of the file name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "shasync.toml",
            Self::MismatchLog => "mismatches.json",
        }
    }
}

impl AsRef<Path> for StateFile {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl std::fmt::Display for StateFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Manifest file name for a top-level item of the work directory.
pub fn sync_manifest_name(item: &str) -> String {
    format!("sync-{item}.json")
}

/// Manifest file name written by `init-compare` for one side of a comparison.
pub fn compare_manifest_name(side: &str, folder: &str) -> String {
    format!("output-{side}-{folder}.json")
}

/// Folder name encoded in a `compare_manifest_name` file name, if any.
pub fn folder_from_compare_manifest(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(".json")?;
    stem.strip_prefix("output-local-")
        .or_else(|| stem.strip_prefix("output-remote-"))
        .filter(|folder| !folder.is_empty())
}
