//! Manifest persistence
//!
//! Appends go straight to the end of the file and are fsync'd one by one, so
//! an interrupted run loses at most the entry being written. Full rewrites go
//! through write-to-temp-then-rename and are never visible half-written.

use std::path::Path;

use shasync_fs::{NormalizedPath, RobustnessConfig, io};

use super::format::{self, Parsed};
use super::{Manifest, ManifestEntry};
use crate::{Error, Result};

/// Shape of a manifest file as found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestForm {
    /// No file yet
    Absent,
    /// Strict JSON document
    Sealed,
    /// Append log, every line complete
    Log,
    /// Append log whose last line was cut off mid-write
    TornLog,
}

/// Outcome of a tolerant load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    pub manifest: Manifest,
    pub form: ManifestForm,
    /// Incomplete trailing line that was discarded
    pub dropped_tail: Option<String>,
}

/// Reads and writes manifest files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestStore {
    robustness: RobustnessConfig,
}

impl ManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_robustness(robustness: RobustnessConfig) -> Self {
        Self { robustness }
    }

    /// Load a manifest strictly.
    ///
    /// A missing file is an empty manifest. A sealed document or a complete
    /// append log is accepted; anything else, including a log with a torn last
    /// line, is [`Error::CorruptManifest`].
    pub fn load(&self, path: &Path) -> Result<Manifest> {
        let recovered = self.recover(path)?;
        match recovered.dropped_tail {
            None => Ok(recovered.manifest),
            Some(tail) => Err(Error::corrupt(
                path,
                format!("incomplete trailing entry {:?}", tail.trim()),
            )),
        }
    }

    /// Load a manifest, dropping an incomplete trailing line of an append log.
    pub fn recover(&self, path: &Path) -> Result<Recovered> {
        let Some(bytes) = io::read_bytes_if_exists(&NormalizedPath::new(path))? else {
            return Ok(Recovered {
                manifest: Manifest::new(),
                form: ManifestForm::Absent,
                dropped_tail: None,
            });
        };
        let content = decode(bytes).map_err(|reason| Error::corrupt(path, reason))?;

        let parsed = format::parse(&content).map_err(|reason| Error::corrupt(path, reason))?;
        Ok(match parsed {
            Parsed::Sealed(manifest) => Recovered {
                manifest,
                form: ManifestForm::Sealed,
                dropped_tail: None,
            },
            Parsed::Log {
                manifest,
                torn_tail: None,
            } => Recovered {
                manifest,
                form: ManifestForm::Log,
                dropped_tail: None,
            },
            Parsed::Log {
                manifest,
                torn_tail: Some(tail),
            } => Recovered {
                manifest,
                form: ManifestForm::TornLog,
                dropped_tail: Some(tail),
            },
        })
    }

    /// Last complete entry, the point an interrupted sync resumes after.
    pub fn last_entry(&self, path: &Path) -> Result<Option<ManifestEntry>> {
        Ok(self.recover(path)?.manifest.last())
    }

    /// Append one entry and flush it to storage.
    ///
    /// The file must be absent or in append-log form with a complete last
    /// line; see [`ManifestStore::reopen_log`].
    pub fn append_entry(&self, path: &Path, entry: &ManifestEntry) -> Result<()> {
        let line = format::entry_line(entry)?;
        io::append_line(
            &NormalizedPath::new(path),
            Some(format::LOG_HEADER),
            &line,
            self.robustness,
        )?;
        Ok(())
    }

    /// Atomically replace the file with the sealed form of `manifest`.
    pub fn rewrite_full(&self, path: &Path, manifest: &Manifest) -> Result<()> {
        let content = format::encode_sealed(manifest)?;
        io::write_atomic(&NormalizedPath::new(path), content.as_bytes(), self.robustness)?;
        Ok(())
    }

    /// Atomically replace the file with the append-log form of `manifest`,
    /// ready for [`ManifestStore::append_entry`].
    pub fn reopen_log(&self, path: &Path, manifest: &Manifest) -> Result<()> {
        let content = format::encode_log(manifest)?;
        io::write_atomic(&NormalizedPath::new(path), content.as_bytes(), self.robustness)?;
        Ok(())
    }
}

/// Decode manifest bytes as UTF-8.
///
/// An append cut off inside a multi-byte character leaves an incomplete
/// sequence at the very end of the file. Those bytes are dropped so the torn
/// line is recovered like any other; invalid bytes anywhere else are damage.
fn decode(bytes: Vec<u8>) -> std::result::Result<String, String> {
    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(err) if err.utf8_error().error_len().is_none() => {
            let valid = err.utf8_error().valid_up_to();
            let mut bytes = err.into_bytes();
            bytes.truncate(valid);
            String::from_utf8(bytes).map_err(|e| e.to_string())
        }
        Err(err) => Err(format!("not valid UTF-8: {}", err.utf8_error())),
    }
}
