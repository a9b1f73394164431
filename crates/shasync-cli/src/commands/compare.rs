//! Comparison manifest and reconciliation command implementations

use std::path::{Path, PathBuf};

use colored::Colorize;

use shasync_core::reconcile::compare;
use shasync_core::{
    ManifestStore, MismatchLog, ReconcileMode, ReconcileReport, ReconcileTarget, Reconciler,
    SyncConfig,
};
use shasync_fs::Sha256Checksum;
use shasync_fs::constants::{compare_manifest_name, folder_from_compare_manifest};

use crate::cli::Side;
use crate::error::{CliError, Result};
use crate::interactive;
use crate::transport::ScpTransport;

use super::{folder_name, resolve_dir};

/// Run the init-compare command
///
/// Writes `output-<side>-<folder>.json` into the manifest directory, or
/// recomputes only the listed paths when a mismatch list is given.
pub fn run_init_compare(
    config: &SyncConfig,
    side: Side,
    work_dir: &Path,
    mismatch_list: Option<&Path>,
) -> Result<PathBuf> {
    let work_dir = resolve_dir(work_dir)?;
    let folder = folder_name(&work_dir)?;
    let output = config
        .state
        .manifest_dir
        .join(compare_manifest_name(side.as_str(), &folder));
    let reconciler = Reconciler::new(config, &Sha256Checksum);

    match mismatch_list {
        Some(list) => {
            let log = MismatchLog::load(list)?;
            println!(
                "{} Re-checking {} path(s) in {}",
                "=>".blue().bold(),
                log.paths().len(),
                output.display().to_string().cyan()
            );
            reconciler.recheck(&work_dir, &output, log.paths())?;
        }
        None => {
            println!(
                "{} Checksumming {}",
                "=>".blue().bold(),
                work_dir.display().to_string().cyan()
            );
            let manifest = reconciler.generate(&work_dir, &output)?;
            println!("   {} {} file(s)", "+".green(), manifest.len());
        }
    }

    println!("{} Wrote {}", "OK".green().bold(), output.display());
    Ok(output)
}

/// Options of the compare command beyond the two manifests.
#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    pub mode: Option<ReconcileMode>,
    pub local_root: Option<PathBuf>,
    pub remote_prefix: Option<String>,
    pub json: bool,
}

/// Run the compare command
pub fn run_compare(
    config: &SyncConfig,
    local: &Path,
    remote: &Path,
    options: CompareOptions,
) -> Result<ReconcileReport> {
    let derived = local
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(folder_from_compare_manifest)
        .map(str::to_string);
    let remote_prefix = options.remote_prefix.or_else(|| derived.clone());

    let mode = match options.mode {
        Some(mode) => mode,
        None => prompt_for_mode(local, remote)?,
    };

    let transport = if mode == ReconcileMode::ReportOnly {
        None
    } else {
        Some(ScpTransport::new(config.require_remote("compare")?))
    };

    let target = ReconcileTarget {
        local_root: match options.local_root {
            Some(root) => root,
            None => std::env::current_dir()?.join(derived.as_deref().unwrap_or_default()),
        },
        remote_prefix: match (mode, remote_prefix) {
            (ReconcileMode::ReportOnly, prefix) => prefix.unwrap_or_default(),
            (_, Some(prefix)) => prefix,
            (_, None) => {
                return Err(CliError::user(format!(
                    "Cannot tell the remote folder from {}; pass --remote-prefix",
                    local.display()
                )));
            }
        },
    };

    let mut reconciler = Reconciler::new(config, &Sha256Checksum);
    if let Some(transport) = &transport {
        reconciler = reconciler.with_transfer(transport);
    }

    if options.json {
        let report = reconciler.run(local, remote, &target, mode)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report);
    }

    println!(
        "{} Comparing {} with {}",
        "=>".blue().bold(),
        local.display().to_string().cyan(),
        remote.display().to_string().cyan()
    );
    let report = reconciler.run(local, remote, &target, mode)?;
    print_report(&report);
    Ok(report)
}

/// Compare once without side effects and ask the user only when there is
/// something to act on.
fn prompt_for_mode(local: &Path, remote: &Path) -> Result<ReconcileMode> {
    let store = ManifestStore::new();
    let comparison = compare(&store.load(local)?, &store.load(remote)?)?;
    if comparison.mismatches.is_empty() {
        return Ok(ReconcileMode::ReportOnly);
    }
    interactive::select_mode(comparison.mismatches.len())
}

fn print_report(report: &ReconcileReport) {
    let comparison = &report.comparison;

    for path in &comparison.missing {
        println!("   {} {}", "MISSING".yellow().bold(), path);
    }
    for record in &comparison.mismatches {
        println!(
            "   {} {} local {} remote {}",
            "MISMATCH".red().bold(),
            record.path,
            record.local_digest.dimmed(),
            record.remote_digest.dimmed()
        );
    }
    for path in &report.resynced {
        println!("   {} {} re-synced", "+".green(), path);
    }
    for outcome in &report.rechecked {
        if outcome.matches {
            println!("   {} {} now matches", "OK".green(), outcome.path);
        } else {
            println!(
                "   {} {} still differs (remote {})",
                "!".red(),
                outcome.path,
                outcome.remote_digest.dimmed()
            );
        }
    }

    if comparison.is_clean() {
        println!("{} Manifests match.", "OK".green().bold());
        return;
    }

    println!(
        "{} {} mismatch(es), {} missing.",
        "DONE".yellow().bold(),
        comparison.mismatches.len(),
        comparison.missing.len()
    );
    if let Some(log) = &report.mismatch_log {
        println!("Mismatched paths written to {}.", log.display().to_string().cyan());
    }
}
