//! Atomic and append-only I/O with file locking

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Knobs for the durable write primitives.
#[derive(Debug, Clone, Copy)]
pub struct RobustnessConfig {
    /// How long to keep retrying an advisory lock held by someone else.
    pub lock_timeout: Duration,
    /// Whether to fsync before reporting a write as done.
    pub enable_fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(10),
            enable_fsync: true,
        }
    }
}

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers see either the old or the new
/// content, never a prefix. Concurrent writers serialize on a sibling
/// `.<name>.lock` file.
pub fn write_atomic(path: &NormalizedPath, content: &[u8], config: RobustnessConfig) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let file_name = native_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let lock_path = native_path.with_file_name(format!(".{file_name}.lock"));
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|e| Error::io(&lock_path, e))?;
    lock_with_timeout(&lock_file, &native_path, config.lock_timeout)?;

    // Same directory keeps the rename on one filesystem
    let temp_path = native_path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

    let result = write_temp_and_rename(&temp_path, &native_path, content, config);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    // Lock released when lock_file is dropped
    drop(lock_file);
    result
}

fn write_temp_and_rename(
    temp_path: &Path,
    target: &Path,
    content: &[u8],
    config: RobustnessConfig,
) -> Result<()> {
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(temp_path)
        .map_err(|e| Error::io(temp_path, e))?;

    temp_file
        .write_all(content)
        .map_err(|e| Error::io(temp_path, e))?;

    if config.enable_fsync {
        temp_file.sync_all().map_err(|e| Error::io(temp_path, e))?;
    }
    drop(temp_file);

    fs::rename(temp_path, target).map_err(|e| Error::io(target, e))
}

fn lock_with_timeout(file: &File, target: &Path, timeout: Duration) -> Result<()> {
    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(Duration::from_millis(10))
        .with_max_interval(Duration::from_millis(200))
        .with_max_elapsed_time(Some(timeout))
        .build();

    backoff::retry(policy, || {
        file.try_lock_exclusive().map_err(backoff::Error::transient)
    })
    .map_err(|_| {
        tracing::warn!(path = %target.display(), "timed out waiting for file lock");
        Error::LockFailed {
            path: target.to_path_buf(),
        }
    })
}

/// Append one line to a file and flush it to storage before returning.
///
/// When the file is absent or empty, `header` (if any) is written first so a
/// fresh file starts in a well-formed state. Never truncates or rewrites
/// existing content: a crash loses at most the line being written.
pub fn append_line(
    path: &NormalizedPath,
    header: Option<&str>,
    line: &str,
    config: RobustnessConfig,
) -> Result<()> {
    let native_path = path.to_native();

    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&native_path)
        .map_err(|e| Error::io(&native_path, e))?;

    let len = file
        .metadata()
        .map_err(|e| Error::io(&native_path, e))?
        .len();

    let mut buf = String::with_capacity(line.len() + 1);
    if len == 0
        && let Some(header) = header
    {
        buf.push_str(header);
        buf.push('\n');
    }
    buf.push_str(line);
    buf.push('\n');

    file.write_all(buf.as_bytes())
        .map_err(|e| Error::io(&native_path, e))?;

    if config.enable_fsync {
        file.sync_data().map_err(|e| Error::io(&native_path, e))?;
    }

    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Read text content, mapping a missing file to `None`.
pub fn read_text_if_exists(path: &NormalizedPath) -> Result<Option<String>> {
    let native_path: PathBuf = path.to_native();
    match fs::read_to_string(&native_path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(&native_path, e)),
    }
}

/// Read raw bytes, mapping a missing file to `None`.
pub fn read_bytes_if_exists(path: &NormalizedPath) -> Result<Option<Vec<u8>>> {
    let native_path = path.to_native();
    match fs::read(&native_path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(&native_path, e)),
    }
}

/// Write text content to a file atomically.
pub fn write_text(path: &NormalizedPath, content: &str, config: RobustnessConfig) -> Result<()> {
    write_atomic(path, content.as_bytes(), config)
}
