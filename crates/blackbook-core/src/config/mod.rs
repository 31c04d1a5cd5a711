//! Configuration: typed model, layered loading, deep merge and editing
//!
//! # Layers
//!
//! Configuration is loaded and merged from these sources (later sources override earlier):
//!
//! 1. **Primary** - `<config_dir>/config.{yaml,yml,toml}`
//! 2. **Local overrides** - `<config_dir>/config.local.{yaml,yml,toml}` (machine-specific)
//! 3. **Extra layers** - any files passed to [`ConfigResolver::with_layer`]
//!
//! # Example
//!
//! ```ignore
//! use blackbook_core::config::ConfigResolver;
//!
//! let resolver = ConfigResolver::from_env()?;
//! let config = resolver.resolve()?;
//! for instance in config.instances() {
//!     println!("{}", instance.key());
//! }
//! ```

mod merge;
mod resolver;
mod store;
mod types;

pub use merge::{deep_merge, merge_layers};
pub use resolver::{CONFIG_DIR_VAR, ConfigResolver};
pub use store::{ConfigEditor, lookup, parse_value};
pub use types::{BlackbookConfig, DriftPolicy, InstanceConfig, Settings, ToolConfig};
