//! Status command implementation

use std::path::Path;

use colored::Colorize;

use blackbook_core::{FileInstanceStatus, FileStatus, SyncStatus};

use super::load_engine;
use crate::error::Result;

/// Run the status command
pub fn run_status(config_dir: Option<&Path>, json: bool) -> Result<()> {
    let engine = load_engine(config_dir)?;
    let statuses = engine.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    if statuses.is_empty() {
        println!("{}", "No files configured".dimmed());
        println!();
        println!("Add entries under {} in {}.", "files:".cyan(), "config.yaml".cyan());
        return Ok(());
    }

    println!("{}", "Blackbook Status".bold());
    println!();
    for status in &statuses {
        print_file_status(status);
    }
    print_summary(&statuses);
    Ok(())
}

fn print_file_status(status: &FileStatus) {
    let headline = if status.failed() || status.drifted() {
        status.name.yellow().bold()
    } else {
        status.name.bold()
    };
    println!("{} ({})", headline, status.kind.to_string().dimmed());
    if status.instances.is_empty() {
        println!("   {}", "no matching instances".dimmed());
    }
    for instance in &status.instances {
        println!("   {}", instance_line(instance));
    }
}

/// One colored status line for a pair.
pub fn instance_line(instance: &FileInstanceStatus) -> String {
    let marker = match instance.status() {
        SyncStatus::Ok => "OK".green().bold(),
        SyncStatus::Missing => "MISSING".yellow().bold(),
        SyncStatus::Drifted => "DRIFTED".red().bold(),
        SyncStatus::Failed => "FAILED".red().bold(),
    };
    let kind = instance
        .drift_kind()
        .map(|k| format!(" [{k}]"))
        .unwrap_or_default();
    format!(
        "{:<8} {} {}{}",
        marker,
        instance.instance_name().cyan(),
        instance.message(),
        kind.dimmed()
    )
}

fn print_summary(statuses: &[FileStatus]) {
    let pairs = statuses.iter().flat_map(|s| s.instances.iter());
    let (mut ok, mut missing, mut drifted, mut failed) = (0, 0, 0, 0);
    for pair in pairs {
        match pair.status() {
            SyncStatus::Ok => ok += 1,
            SyncStatus::Missing => missing += 1,
            SyncStatus::Drifted => drifted += 1,
            SyncStatus::Failed => failed += 1,
        }
    }
    println!();
    println!(
        "{} ok, {} missing, {} drifted, {} failed",
        ok, missing, drifted, failed
    );
    if missing > 0 {
        println!("Run {} to install missing targets.", "blackbook sync".cyan());
    }
    if drifted > 0 {
        println!("Run {} to settle drift.", "blackbook resolve".cyan());
    }
}
