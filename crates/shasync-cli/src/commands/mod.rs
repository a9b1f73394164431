//! Command implementations for shasync-cli

pub mod compare;
pub mod sync;

pub use compare::{run_compare, run_init_compare};
pub use sync::run_sync;

use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

/// Absolute form of a directory argument, failing early when it is not a
/// directory.
pub(crate) fn resolve_dir(path: &Path) -> Result<PathBuf> {
    let resolved = dunce::canonicalize(path)
        .map_err(|e| CliError::user(format!("Cannot open {}: {e}", path.display())))?;
    if !resolved.is_dir() {
        return Err(CliError::user(format!("{} is not a directory", path.display())));
    }
    Ok(resolved)
}

/// Last path component as text.
pub(crate) fn folder_name(dir: &Path) -> Result<String> {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::user(format!("{} has no folder name", dir.display())))
}
