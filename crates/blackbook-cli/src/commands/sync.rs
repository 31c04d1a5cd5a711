//! Sync command implementation

use std::path::Path;

use colored::Colorize;

use blackbook_core::{SyncOptions, SyncReport};

use super::load_engine;
use crate::error::{CliError, Result};

/// Run the sync command
///
/// Installs missing targets and records baselines. Exits non-zero when any
/// pair failed.
pub fn run_sync(config_dir: Option<&Path>, dry_run: bool, json: bool) -> Result<()> {
    let engine = load_engine(config_dir)?;
    if !json {
        println!(
            "{} Syncing {} file entries...",
            "=>".blue().bold(),
            engine.config().files.len()
        );
    }

    let report = engine.sync(&SyncOptions { dry_run })?;
    print_report(&report, json)?;
    if !report.drifted.is_empty() && !json {
        println!();
        println!("Run {} to settle drift.", "blackbook resolve".cyan());
    }
    finish(&report)
}

/// Print a report as JSON or as colored lines.
pub fn print_report(report: &SyncReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    if report.actions.is_empty() && report.drifted.is_empty() && report.errors.is_empty() {
        println!("{} Nothing to do.", "OK".green().bold());
        return Ok(());
    }
    for action in &report.actions {
        println!("   {} {}", "+".green(), action);
    }
    for drifted in &report.drifted {
        println!("   {} {}", "!".yellow(), drifted);
    }
    for error in &report.errors {
        println!("   {} {}", "x".red(), error);
    }
    Ok(())
}

/// Turn a failed report into a non-zero exit.
pub fn finish(report: &SyncReport) -> Result<()> {
    if report.success {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "{} item(s) failed",
            report.errors.len()
        )))
    }
}
