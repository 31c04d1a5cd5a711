//! Diff command implementation
//!
//! Shows the content differences behind every drifted pair and the targets
//! a sync would create.

use std::path::Path;

use colored::Colorize;
use serde_json::json;

use blackbook_core::{FileStatus, SyncStatus};

use super::load_engine;
use crate::error::Result;

/// Run the diff command
pub fn run_diff(config_dir: Option<&Path>, name: Option<&str>, json: bool) -> Result<()> {
    let engine = load_engine(config_dir)?;
    let statuses: Vec<FileStatus> = engine
        .status()?
        .into_iter()
        .filter(|s| name.is_none_or(|n| matches_asset(&s.name, n)))
        .collect();

    if json {
        let entries: Vec<_> = statuses
            .iter()
            .flat_map(|s| {
                s.instances
                    .iter()
                    .filter(|i| i.status() != SyncStatus::Ok)
                    .map(move |i| {
                        json!({
                            "name": s.name,
                            "instance": i.instance_name(),
                            "status": i.status(),
                            "drift_kind": i.drift_kind(),
                            "message": i.message(),
                            "diff": i.diff(),
                        })
                    })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let mut shown = 0;
    for status in &statuses {
        for instance in &status.instances {
            match instance.status() {
                SyncStatus::Ok => continue,
                SyncStatus::Missing => println!(
                    "{} {} ({}): would install to {}",
                    "+".green().bold(),
                    status.name.bold(),
                    instance.instance_name().cyan(),
                    instance.target_path()
                ),
                SyncStatus::Drifted => {
                    println!(
                        "{} {} ({}): {}",
                        "~".red().bold(),
                        status.name.bold(),
                        instance.instance_name().cyan(),
                        instance.message()
                    );
                    if let Some(diff) = instance.diff() {
                        print_diff(diff);
                    }
                }
                SyncStatus::Failed => println!(
                    "{} {} ({}): {}",
                    "!".red().bold(),
                    status.name.bold(),
                    instance.instance_name().cyan(),
                    instance.message()
                ),
            }
            shown += 1;
        }
    }

    if shown == 0 {
        match name {
            Some(name) if statuses.is_empty() => {
                return Err(blackbook_core::Error::UnknownAsset {
                    name: name.to_string(),
                }
                .into());
            }
            _ => println!("{} Everything is in sync.", "OK".green().bold()),
        }
    }
    Ok(())
}

fn matches_asset(status_name: &str, wanted: &str) -> bool {
    status_name == wanted
        || status_name
            .strip_prefix(wanted)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Print a unified diff with colored additions and removals.
pub fn print_diff(diff: &str) {
    for line in diff.lines() {
        let colored = if line.starts_with("+++") || line.starts_with("---") {
            line.bold()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else if line.starts_with("@@") {
            line.cyan()
        } else {
            line.normal()
        };
        println!("    {colored}");
    }
}
