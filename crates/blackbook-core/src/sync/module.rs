//! Sync module abstraction
//!
//! A sync module knows how to compare and copy one kind of asset. The module
//! for an asset is selected once from its [`AssetKind`]; everything above
//! this layer is kind-agnostic.

use std::path::Path;

use serde::Serialize;

use super::directory::DirectorySync;
use super::file::FileSync;
use super::status::SyncStatus;
use crate::Result;
use crate::asset::AssetKind;

/// One source/target pair handed to a sync module.
#[derive(Debug, Clone, Copy)]
pub struct SyncRequest<'a> {
    pub source: &'a Path,
    pub target: &'a Path,
    /// `tool:instance` the target belongs to
    pub owner: &'a str,
}

impl<'a> SyncRequest<'a> {
    pub fn new(source: &'a Path, target: &'a Path, owner: &'a str) -> Self {
        Self {
            source,
            target,
            owner,
        }
    }

    /// `(from, to)` for a copy in `direction`.
    pub fn endpoints(&self, direction: Direction) -> (&'a Path, &'a Path) {
        match direction {
            Direction::Forward => (self.source, self.target),
            Direction::Pullback => (self.target, self.source),
        }
    }
}

/// Copy direction for [`SyncModule::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Source to target
    Forward,
    /// Target back to source
    Pullback,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Pullback => write!(f, "pullback"),
        }
    }
}

/// Result of a read-only check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCheck {
    pub status: SyncStatus,
    pub message: String,
    pub diff: Option<String>,
}

impl SyncCheck {
    pub fn new(status: SyncStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            diff: None,
        }
    }

    pub fn drifted(message: impl Into<String>, diff: String) -> Self {
        Self {
            status: SyncStatus::Drifted,
            message: message.into(),
            diff: Some(diff),
        }
    }
}

/// Result of an apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    /// False only when the destination already matched
    pub changed: bool,
}

/// Compare and copy one kind of asset.
pub trait SyncModule: Send + Sync {
    fn kind(&self) -> AssetKind;

    /// Compare source and target without touching either.
    ///
    /// - `failed` if the source does not exist
    /// - `missing` if the target does not exist
    /// - `ok` or `drifted` otherwise
    fn check(&self, request: &SyncRequest<'_>) -> Result<SyncCheck>;

    /// Make the destination of `direction` identical to its origin.
    ///
    /// # Errors
    ///
    /// [`Error::SourceMissing`](crate::Error::SourceMissing) or
    /// [`Error::TargetMissing`](crate::Error::TargetMissing) when the copy
    /// origin does not exist.
    fn apply(&self, request: &SyncRequest<'_>, direction: Direction) -> Result<ApplyOutcome>;
}

/// The sync module for `kind`.
pub fn module_for(kind: AssetKind) -> Box<dyn SyncModule> {
    match kind {
        AssetKind::File => Box::new(FileSync),
        AssetKind::Directory => Box::new(DirectorySync),
    }
}

/// Error for a missing copy origin.
pub(crate) fn origin_missing(direction: Direction, path: &Path) -> crate::Error {
    match direction {
        Direction::Forward => crate::Error::SourceMissing {
            path: path.to_path_buf(),
        },
        Direction::Pullback => crate::Error::TargetMissing {
            path: path.to_path_buf(),
        },
    }
}
