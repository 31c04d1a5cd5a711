//! Sync and drift engine for Blackbook
//!
//! This crate sits between the filesystem primitives in `blackbook-fs` and the
//! `blackbook` command line, implementing:
//!
//! - **Configuration**: layered YAML/TOML config with key-aware deep merge
//! - **Assets**: resolution of declared assets into source/target pairs per instance
//! - **Manifest**: the installed-item record holding last-synced baselines
//! - **Sync**: file and directory sync modules, drift classification, and
//!   the conflict resolution protocol
//!
//! # Architecture
//!
//! ```text
//!               blackbook (CLI)
//!                     |
//!               blackbook-core
//!   config -> asset -> sync::Classifier -> sync::SyncEngine
//!                            |                 |
//!                        manifest  <-----------+
//!                     |
//!               blackbook-fs
//! ```
//!
//! # Example
//!
//! ```ignore
//! use blackbook_core::{ConfigResolver, SyncEngine, SyncOptions};
//!
//! fn example() -> blackbook_core::Result<()> {
//!     let config = ConfigResolver::from_env()?.resolve()?;
//!     let engine = SyncEngine::from_config(config)?;
//!     let report = engine.sync(&SyncOptions::default())?;
//!     assert!(report.success);
//!     Ok(())
//! }
//! ```

pub mod asset;
pub mod config;
pub mod error;
pub mod manifest;
pub mod sync;

pub use asset::{Asset, AssetKind, Instance, ResolvedAsset, SourceLocation};
pub use config::{BlackbookConfig, ConfigEditor, ConfigResolver, DriftPolicy, deep_merge};
pub use error::{Error, Result};
pub use manifest::{InstalledItem, Manifest, ManifestStore};
pub use sync::{
    Conflict, ConflictAction, ConflictPrompt, DriftKind, FileInstanceStatus, FileStatus,
    SyncEngine, SyncOptions, SyncReport, SyncStatus,
};
