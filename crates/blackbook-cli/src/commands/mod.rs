//! Command implementations for blackbook-cli

pub mod config;
pub mod diff;
pub mod resolve;
pub mod status;
pub mod sync;
pub mod uninstall;

use std::path::Path;

use blackbook_core::{BlackbookConfig, ConfigResolver, SyncEngine};

pub use config::{run_config_get, run_config_path, run_config_set, run_config_show, run_config_unset};
pub use diff::run_diff;
pub use resolve::run_resolve;
pub use status::run_status;
pub use sync::run_sync;
pub use uninstall::run_uninstall;

use crate::error::Result;

/// Config resolver for `--config-dir`, or the default location.
pub fn resolver(config_dir: Option<&Path>) -> Result<ConfigResolver> {
    match config_dir {
        Some(dir) => Ok(ConfigResolver::new(dir)),
        None => Ok(ConfigResolver::from_env()?),
    }
}

/// Resolve the configuration and build an engine over it.
pub fn load_engine(config_dir: Option<&Path>) -> Result<SyncEngine> {
    let config: BlackbookConfig = resolver(config_dir)?.resolve()?;
    tracing::debug!(
        files = config.files.len(),
        instances = config.instances().len(),
        "Configuration resolved"
    );
    Ok(SyncEngine::from_config(config)?)
}
