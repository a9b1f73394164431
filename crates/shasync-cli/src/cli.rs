//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use shasync_core::ReconcileMode;

/// shasync - resumable, checksum-verified push of a directory tree over SSH
#[derive(Parser, Debug)]
#[command(name = "shasync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (TOML, JSON or YAML); defaults to ./shasync.toml
    #[arg(short, long, global = true, env = "SHASYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Which side of a comparison a manifest describes
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// `--mode` values
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Report and write the mismatch log only
    Report,
    /// Copy mismatched files to the remote again
    Resync,
    /// Ask the remote for fresh checksums
    Recheck,
    /// Resync, then recheck
    Both,
}

impl From<ModeArg> for ReconcileMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Report => ReconcileMode::ReportOnly,
            ModeArg::Resync => ReconcileMode::Resync,
            ModeArg::Recheck => ReconcileMode::Recheck,
            ModeArg::Both => ReconcileMode::Both,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Push every top-level item of a work directory to the remote host
    ///
    /// Each item gets its own `sync-<item>.json` manifest. Re-running after an
    /// interruption skips everything already recorded.
    Sync {
        /// Directory whose contents are mirrored to the remote root
        work_dir: PathBuf,
    },

    /// Build a comparison manifest for one side
    ///
    /// Writes `output-<side>-<folder>.json`. With a mismatch list, only the
    /// listed paths of an existing manifest are recomputed.
    ///
    /// Examples:
    ///   shasync init-compare local ./2023
    ///   shasync init-compare remote /mnt/vol1/archive/2023 mismatches.json
    InitCompare {
        /// Which side this machine holds
        #[arg(value_enum)]
        side: Side,

        /// Folder to checksum
        work_dir: PathBuf,

        /// JSON array of paths to recompute
        mismatch_list: Option<PathBuf>,
    },

    /// Compare a local and a remote manifest
    Compare {
        /// Manifest produced by `init-compare local`
        local: PathBuf,

        /// Manifest produced by `init-compare remote`
        remote: PathBuf,

        /// What to do about mismatches; prompts when omitted
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Local folder the manifest keys are relative to
        #[arg(long)]
        local_root: Option<PathBuf>,

        /// Remote folder (under the configured root) the keys are relative to
        #[arg(long)]
        remote_prefix: Option<String>,

        /// Print the report as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
