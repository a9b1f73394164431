//! SSH transport
//!
//! Implements [`TransferProvider`] by shelling out to `scp` and `ssh`. Every
//! call blocks until the child process exits.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use shasync_core::{RemoteConfig, TransferProvider, TransportError};
use shasync_fs::checksum::parse_sum_output;
use shasync_fs::remote_join;

/// `scp`/`ssh` based transfer provider
#[derive(Debug, Clone)]
pub struct ScpTransport {
    host: String,
    root: String,
    identity: Option<PathBuf>,
    port: Option<u16>,
}

impl ScpTransport {
    pub fn new(remote: &RemoteConfig) -> Self {
        Self {
            host: remote.host.clone(),
            root: remote.root.trim_end_matches('/').to_string(),
            identity: remote.identity_path(),
            port: remote.port,
        }
    }

    /// Absolute remote path of a remote-relative key.
    fn absolute(&self, remote: &str) -> String {
        format!("{}{}", self.root, remote_join("", remote))
    }

    fn ssh(&self, command: &str) -> Result<Output, TransportError> {
        let mut cmd = Command::new("ssh");
        if let Some(identity) = &self.identity {
            cmd.arg("-i").arg(identity);
        }
        if let Some(port) = self.port {
            cmd.arg("-p").arg(port.to_string());
        }
        cmd.arg(&self.host).arg(command);
        run(cmd, "ssh")
    }
}

impl TransferProvider for ScpTransport {
    fn copy(&self, local: &Path, remote: &str) -> Result<(), TransportError> {
        let target = format!("{}:{}", self.host, shell_quote(&self.absolute(remote)));

        let mut cmd = Command::new("scp");
        // -p keeps modification times, -q silences the progress meter
        cmd.arg("-p").arg("-q");
        if let Some(identity) = &self.identity {
            cmd.arg("-i").arg(identity);
        }
        if let Some(port) = self.port {
            cmd.arg("-P").arg(port.to_string());
        }
        cmd.arg(local).arg(target);
        run(cmd, "scp").map(|_| ())
    }

    fn make_remote_dir(&self, remote: &str) -> Result<(), TransportError> {
        let command = format!("mkdir -p {}", shell_quote(&self.absolute(remote)));
        self.ssh(&command).map(|_| ())
    }

    fn remote_digest(&self, remote: &str) -> Result<String, TransportError> {
        let command = format!("sha256sum {}", shell_quote(&self.absolute(remote)));
        let output = self.ssh(&command)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_sum_output(&stdout).ok_or_else(|| {
            TransportError::permanent(format!("unexpected sha256sum output: {}", stdout.trim()))
        })
    }
}

/// Run a child process, classifying failures.
///
/// Failing to start the program is permanent. A non-zero exit is treated as a
/// dropped connection and is transient.
fn run(mut cmd: Command, program: &str) -> Result<Output, TransportError> {
    tracing::debug!(command = ?cmd, "running");
    let output = cmd
        .output()
        .map_err(|e| TransportError::permanent(format!("cannot run {program}: {e}")))?;

    if output.status.success() {
        Ok(output)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output.status.code().unwrap_or(-1);
        Err(TransportError::transient(format!(
            "{program} exited with {code}: {}",
            stderr.trim()
        )))
    }
}

/// Quote a string for a POSIX shell on the remote side.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> ScpTransport {
        ScpTransport::new(&RemoteConfig {
            host: "me@nas".into(),
            root: "/mnt/archive/".into(),
            identity: None,
            port: Some(2222),
        })
    }

    #[test]
    fn remote_paths_are_under_root() {
        assert_eq!(transport().absolute("/2023/a b.mp4"), "/mnt/archive/2023/a b.mp4");
    }

    #[test]
    fn quoting_survives_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("a b"), "'a b'");
    }

    #[test]
    fn missing_program_is_permanent() {
        let err = run(Command::new("definitely-not-a-real-binary-xyz"), "fake").unwrap_err();
        assert!(!err.is_transient());
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_transient() {
        let err = run(Command::new("false"), "false").unwrap_err();
        assert!(err.is_transient());
    }
}
