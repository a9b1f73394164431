//! Interactive prompts for CLI commands
//!
//! Uses dialoguer for terminal-based interactive selection.

use dialoguer::Select;
use shasync_core::ReconcileMode;

use crate::error::Result;

/// Ask what to do about mismatched files.
pub fn select_mode(mismatches: usize) -> Result<ReconcileMode> {
    let labels: Vec<&str> = ReconcileMode::ALL.iter().map(|m| m.describe()).collect();

    let idx = Select::new()
        .with_prompt(format!("{mismatches} file(s) differ. What now?"))
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(ReconcileMode::ALL[idx])
}
