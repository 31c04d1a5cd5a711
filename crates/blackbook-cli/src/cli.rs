//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use clap_complete::Shell;

use blackbook_core::ConflictAction;

/// Blackbook - Sync config assets from one source repo into your tools
#[derive(Parser, Debug)]
#[command(name = "blackbook")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration directory
    #[arg(long, global = true, env = "BLACKBOOK_CONFIG_DIR", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show the sync status of every asset in every instance
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show what differs between sources and targets
    ///
    /// Diffs read from target to source: `+` lines are what a forward
    /// sync would write.
    Diff {
        /// Only this asset (glob-derived assets match by prefix)
        name: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Install missing targets and record baselines
    ///
    /// Drifted targets are reported but never touched; use `resolve`.
    Sync {
        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,

        /// Output as JSON for CI/CD integration
        #[arg(long)]
        json: bool,
    },

    /// Resolve drifted assets
    ///
    /// Without a decision flag each drifted pair is presented interactively.
    /// With a NAME, only that asset in --instance is resolved.
    ///
    /// Examples:
    ///   blackbook resolve                          # Ask for each drifted pair
    ///   blackbook resolve --forward                # Source wins everywhere
    ///   blackbook resolve CLAUDE.md -i claude:work --pullback
    #[command(group(ArgGroup::new("decision").args(["forward", "pullback", "skip"])))]
    Resolve {
        /// Asset to resolve
        #[arg(requires = "instance")]
        name: Option<String>,

        /// Instance as `tool:instance` or a bare instance id
        #[arg(short, long, requires = "name")]
        instance: Option<String>,

        /// Copy source over target
        #[arg(long)]
        forward: bool,

        /// Copy target back over source
        #[arg(long)]
        pullback: bool,

        /// Leave drifted pairs alone
        #[arg(long)]
        skip: bool,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove an asset from every instance
    Uninstall {
        /// Asset name
        name: String,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage configuration
    Config {
        /// Config action to perform
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    ///
    /// Examples:
    ///   blackbook completions bash > ~/.local/share/bash-completion/completions/blackbook
    ///   blackbook completions zsh > ~/.zfunc/_blackbook
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Commands {
    /// The decision flag given to `resolve`, if any.
    pub fn resolve_action(forward: bool, pullback: bool, skip: bool) -> Option<ConflictAction> {
        match (forward, pullback, skip) {
            (true, _, _) => Some(ConflictAction::ForceForward),
            (_, true, _) => Some(ConflictAction::ForcePullback),
            (_, _, true) => Some(ConflictAction::Skip),
            _ => None,
        }
    }
}

/// Configuration actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Display the effective (merged) configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective value of a dotted key
    Get {
        /// Dotted key path, e.g. `settings.drift_policy`
        key: String,
    },

    /// Set a dotted key in the primary config file
    ///
    /// VALUE is parsed as YAML, so `true`, `42` and `[a, b]` keep their types.
    Set {
        /// Dotted key path
        key: String,
        /// New value
        value: String,
    },

    /// Remove a dotted key from the primary config file
    Unset {
        /// Dotted key path
        key: String,
    },

    /// Print the configuration layers in merge order
    Path,
}
