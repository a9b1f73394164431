//! Checksum doubles.

use std::io;
use std::path::Path;

use shasync_fs::{ChecksumProvider, Error, Result};

/// Fails for every path, as if the file became unreadable after transfer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingChecksum;

impl ChecksumProvider for FailingChecksum {
    fn digest(&self, path: &Path) -> Result<String> {
        Err(Error::Checksum {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "scripted failure"),
        })
    }
}
