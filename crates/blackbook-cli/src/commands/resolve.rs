//! Resolve command implementation

use std::io::IsTerminal;
use std::path::Path;

use colored::Colorize;

use blackbook_core::sync::{FixedPrompt, RefusingPrompt};
use blackbook_core::{ConflictAction, ConflictPrompt, SyncOptions};

use super::load_engine;
use super::sync::{finish, print_report};
use crate::error::{CliError, Result};
use crate::prompt::InteractivePrompt;

/// Run the resolve command
///
/// With `name` and `instance`, resolves that pair with `action`. Otherwise
/// walks every drifted pair; without `action` the user is asked, and when
/// stdin is not a terminal conflicts are refused.
pub fn run_resolve(
    config_dir: Option<&Path>,
    name: Option<&str>,
    instance: Option<&str>,
    action: Option<ConflictAction>,
    dry_run: bool,
) -> Result<()> {
    let engine = load_engine(config_dir)?;
    let options = SyncOptions { dry_run };

    let report = match (name, instance) {
        (Some(name), Some(instance)) => {
            let action = action.ok_or_else(|| {
                CliError::user("Resolving a single asset needs --forward, --pullback or --skip")
            })?;
            engine.resolve_pair(name, instance, action, &options)?
        }
        _ => {
            let mut prompt: Box<dyn ConflictPrompt> = match action {
                Some(action) => Box::new(FixedPrompt(action)),
                None if std::io::stdin().is_terminal() => Box::new(InteractivePrompt::new()),
                None => Box::new(RefusingPrompt),
            };
            engine.resolve(prompt.as_mut(), &options)?
        }
    };

    if report.resolutions.is_empty() && report.errors.is_empty() {
        println!("{} No drifted files.", "OK".green().bold());
        return Ok(());
    }
    print_report(&report, false)?;
    let untouched = report
        .resolutions
        .iter()
        .filter(|r| !r.changed && r.action != ConflictAction::Skip && !dry_run);
    for resolution in untouched {
        println!(
            "   {} {} ({}) already in sync",
            "=".dimmed(),
            resolution.asset,
            resolution.instance
        );
    }
    finish(&report)
}
