//! Sync command implementation

use std::path::Path;

use colored::Colorize;

use shasync_core::{SyncConfig, SyncEngine};
use shasync_fs::Sha256Checksum;

use crate::error::Result;
use crate::transport::ScpTransport;

use super::resolve_dir;

/// Run the sync command
///
/// Pushes every top-level item of `work_dir` to the configured remote root.
pub fn run_sync(config: &SyncConfig, work_dir: &Path) -> Result<()> {
    let work_dir = resolve_dir(work_dir)?;
    let remote = config.require_remote("sync")?;
    let transport = ScpTransport::new(remote);
    let engine = SyncEngine::new(config, &transport, &Sha256Checksum);

    println!(
        "{} Syncing {} to {}:{}",
        "=>".blue().bold(),
        work_dir.display().to_string().cyan(),
        remote.host,
        remote.root
    );

    let report = engine.sync_all(&work_dir)?;

    for root in &report.roots {
        if let Some(last) = &root.resumed_after {
            println!("   {} {} resumed after {}", "~".yellow(), root.item.cyan(), last.dimmed());
        }
        println!(
            "   {} {}: {} transferred, {} already synced",
            "+".green(),
            root.item.cyan(),
            root.transferred.len(),
            root.skipped
        );
    }

    println!(
        "{} {} item(s), {} file(s) transferred, {} skipped.",
        "OK".green().bold(),
        report.roots.len(),
        report.transferred(),
        report.skipped()
    );
    Ok(())
}
