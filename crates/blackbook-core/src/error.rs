//! Error types for blackbook-core

use std::path::PathBuf;

/// Result type for blackbook-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in blackbook-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The manifest exists but cannot be parsed. Never replaced with an empty one.
    #[error("Manifest at {path} is corrupted: {message}")]
    ManifestCorrupted { path: PathBuf, message: String },

    /// The copy origin of a forward apply does not exist
    #[error("Source not found: {path}")]
    SourceMissing { path: PathBuf },

    /// The copy origin of a pullback apply does not exist
    #[error("Target not found: {path}")]
    TargetMissing { path: PathBuf },

    /// A conflicted pair needs a decision from the caller
    #[error("Conflict in {asset} for {instance} requires a decision")]
    ConflictUnresolved { asset: String, instance: String },

    #[error("Unknown asset: {name}")]
    UnknownAsset { name: String },

    #[error("Unknown instance: {name}")]
    UnknownInstance { name: String },

    /// Configuration is well-formed but semantically invalid
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from blackbook-fs
    #[error(transparent)]
    Fs(#[from] blackbook_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// TOML document editing error
    #[error(transparent)]
    TomlEdit(#[from] toml_edit::TomlError),
}

impl Error {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
