//! Blackbook CLI
//!
//! The command-line interface for syncing config assets into tool instances.

mod cli;
mod commands;
mod error;
mod logging;
mod prompt;

use std::path::Path;

use clap::{CommandFactory, Parser};
use colored::Colorize;

use cli::{Cli, Commands, ConfigAction};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    tracing::debug!(config_dir = ?cli.config_dir, "Starting");

    match cli.command {
        Some(cmd) => execute_command(cmd, cli.config_dir.as_deref()),
        None => {
            // No command provided - show help hint
            println!("{} keeps your tool configs in sync", "blackbook".green().bold());
            println!();
            println!("Run {} for available commands.", "blackbook --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(cmd: Commands, config_dir: Option<&Path>) -> Result<()> {
    match cmd {
        Commands::Status { json } => commands::run_status(config_dir, json),
        Commands::Diff { name, json } => commands::run_diff(config_dir, name.as_deref(), json),
        Commands::Sync { dry_run, json } => commands::run_sync(config_dir, dry_run, json),
        Commands::Resolve {
            name,
            instance,
            forward,
            pullback,
            skip,
            dry_run,
        } => commands::run_resolve(
            config_dir,
            name.as_deref(),
            instance.as_deref(),
            Commands::resolve_action(forward, pullback, skip),
            dry_run,
        ),
        Commands::Uninstall { name, dry_run } => {
            commands::run_uninstall(config_dir, &name, dry_run)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => commands::run_config_show(config_dir, json),
            ConfigAction::Get { key } => commands::run_config_get(config_dir, &key),
            ConfigAction::Set { key, value } => commands::run_config_set(config_dir, &key, &value),
            ConfigAction::Unset { key } => commands::run_config_unset(config_dir, &key),
            ConfigAction::Path => commands::run_config_path(config_dir),
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "blackbook", &mut std::io::stdout());
            Ok(())
        }
    }
}
