//! Interactive conflict prompt
//!
//! Uses dialoguer for terminal-based selection.

use colored::Colorize;
use dialoguer::Select;

use blackbook_core::{Conflict, ConflictAction, ConflictPrompt, DriftKind};

use crate::commands::diff::print_diff;

const CHOICES: [(&str, ConflictAction); 3] = [
    ("Force forward (source -> target)", ConflictAction::ForceForward),
    ("Force pullback (target -> source)", ConflictAction::ForcePullback),
    ("Skip", ConflictAction::Skip),
];

/// Asks on the terminal for every conflict.
#[derive(Debug, Default)]
pub struct InteractivePrompt;

impl InteractivePrompt {
    pub fn new() -> Self {
        Self
    }
}

impl ConflictPrompt for InteractivePrompt {
    fn decide(&mut self, conflict: &Conflict) -> blackbook_core::Result<ConflictAction> {
        let reason = match conflict.drift_kind {
            Some(DriftKind::SourceChanged) => "source changed since last sync",
            Some(DriftKind::TargetChanged) => "target was edited in place",
            Some(DriftKind::BothChanged) => "both sides changed since last sync",
            None => "never synced and differs",
        };
        println!();
        println!(
            "{} {} ({}): {}",
            "Conflict".red().bold(),
            conflict.file_name.bold(),
            conflict.instance.cyan(),
            reason
        );
        if let Some(diff) = &conflict.diff {
            print_diff(diff);
        }

        let default = match conflict.drift_kind {
            Some(DriftKind::SourceChanged) => 0,
            Some(DriftKind::TargetChanged) => 1,
            _ => 2,
        };
        let labels: Vec<&str> = CHOICES.iter().map(|(label, _)| *label).collect();
        let index = Select::new()
            .with_prompt("Resolve")
            .items(&labels)
            .default(default)
            .interact()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        Ok(CHOICES[index].1)
    }
}
