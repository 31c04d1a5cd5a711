//! Uninstall command implementation

use std::path::Path;

use colored::Colorize;

use blackbook_core::SyncOptions;

use super::load_engine;
use super::sync::{finish, print_report};
use crate::error::Result;

/// Remove an asset's targets from every instance and drop its manifest items.
pub fn run_uninstall(config_dir: Option<&Path>, name: &str, dry_run: bool) -> Result<()> {
    let engine = load_engine(config_dir)?;
    println!("{} Uninstalling {}...", "=>".blue().bold(), name.cyan());

    let report = engine.uninstall(name, &SyncOptions { dry_run })?;
    print_report(&report, false)?;
    finish(&report)
}
