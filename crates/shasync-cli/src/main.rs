//! shasync CLI
//!
//! Resumable, checksum-verified push of a directory tree to a remote host over
//! SSH, plus manifest comparison and repair.

mod cli;
mod commands;
mod error;
mod interactive;
mod transport;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use commands::compare::CompareOptions;
use error::Result;
use shasync_core::SyncConfig;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = SyncConfig::load(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration loaded");

    execute_command(&config, cli.command)
}

fn init_tracing(verbose: bool) {
    let builder = FmtSubscriber::builder().with_writer(std::io::stderr);
    let result = if verbose {
        let subscriber = builder
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let subscriber = builder.with_env_filter(filter).with_target(false).finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    if result.is_err() {
        eprintln!("{}: tracing subscriber already installed", "warning".yellow());
    }
    tracing::debug!("Verbose mode enabled");
}

fn execute_command(config: &SyncConfig, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Sync { work_dir } => commands::run_sync(config, &work_dir),
        Commands::InitCompare {
            side,
            work_dir,
            mismatch_list,
        } => commands::run_init_compare(config, side, &work_dir, mismatch_list.as_deref()).map(|_| ()),
        Commands::Compare {
            local,
            remote,
            mode,
            local_root,
            remote_prefix,
            json,
        } => {
            let options = CompareOptions {
                mode: mode.map(Into::into),
                local_root,
                remote_prefix,
                json,
            };
            commands::run_compare(config, &local, &remote, options).map(|_| ())
        }
    }
}
