//! Status classification, sync modules and the conflict protocol
//!
//! This module provides:
//! - **module**: the [`SyncModule`] abstraction with file and directory implementations
//! - **classifier**: per-pair status and three-way drift classification
//! - **conflict**: decisions for drifted pairs
//! - **engine**: the [`SyncEngine`] orchestrating sync, resolve and uninstall

mod classifier;
mod conflict;
mod diff;
mod directory;
mod engine;
mod file;
mod module;
mod status;

pub use classifier::{
    AssetReport, Classification, Classifier, Fingerprints, PairState, drift_kind,
};
pub use conflict::{
    Conflict, ConflictAction, ConflictPrompt, FixedPrompt, RefusingPrompt, ScriptedPrompt,
    policy_action,
};
pub use diff::unified_diff;
pub use directory::DirectorySync;
pub use engine::{DecidedBy, Resolution, SyncEngine, SyncOptions, SyncReport};
pub use file::FileSync;
pub use module::{ApplyOutcome, Direction, SyncCheck, SyncModule, SyncRequest, module_for};
pub use status::{DriftKind, FileInstanceStatus, FileStatus, SyncStatus};
