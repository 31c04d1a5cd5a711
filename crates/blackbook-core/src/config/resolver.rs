//! Layered configuration loading
//!
//! The `ConfigResolver` loads every configuration layer that exists and folds
//! them through [`deep_merge`](super::merge::deep_merge), later layers
//! overriding earlier ones.

use std::path::{Path, PathBuf};

use blackbook_fs::ConfigStore;
use serde_json::Value;

use super::merge::merge_layers;
use super::types::BlackbookConfig;
use crate::{Error, Result};

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_VAR: &str = "BLACKBOOK_CONFIG_DIR";

const LAYER_EXTENSIONS: [&str; 3] = ["yaml", "yml", "toml"];

/// Resolves configuration by merging multiple layers.
///
/// Layers, in order:
/// 1. Primary config (`<config_dir>/config.{yaml,yml,toml}`)
/// 2. Machine overrides (`<config_dir>/config.local.{yaml,yml,toml}`)
/// 3. Extra layer files added with [`ConfigResolver::with_layer`]
///
/// Missing layers are skipped. A malformed layer is an error naming the file.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    config_dir: PathBuf,
    extra_layers: Vec<PathBuf>,
    store: ConfigStore,
}

impl ConfigResolver {
    /// Create a resolver for an explicit configuration directory.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            extra_layers: Vec::new(),
            store: ConfigStore::new(),
        }
    }

    /// Create a resolver for the default configuration directory.
    ///
    /// Uses `$BLACKBOOK_CONFIG_DIR` when set, otherwise the platform config
    /// directory via `dirs::config_dir()`:
    /// - Linux: `~/.config/blackbook/`
    /// - macOS: `~/Library/Application Support/blackbook/`
    /// - Windows: `%APPDATA%\blackbook\`
    pub fn from_env() -> Result<Self> {
        let dir = std::env::var_os(CONFIG_DIR_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::config_dir().map(|d| d.join("blackbook")))
            .ok_or_else(|| {
                Error::invalid_config(format!(
                    "no platform config directory; set {CONFIG_DIR_VAR}"
                ))
            })?;
        Ok(Self::new(dir))
    }

    /// Add an extra layer applied after the primary and local layers.
    pub fn with_layer(mut self, path: impl Into<PathBuf>) -> Self {
        self.extra_layers.push(path.into());
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// The primary layer: the first existing `config.*`, else `config.yaml`.
    pub fn primary_path(&self) -> PathBuf {
        self.find_layer("config")
            .unwrap_or_else(|| self.config_dir.join("config.yaml"))
    }

    fn find_layer(&self, stem: &str) -> Option<PathBuf> {
        let mut found = LAYER_EXTENSIONS
            .iter()
            .map(|ext| self.config_dir.join(format!("{stem}.{ext}")))
            .filter(|p| p.is_file());
        let first = found.next()?;
        for ignored in found {
            tracing::warn!(
                used = %first.display(),
                ignored = %ignored.display(),
                "Multiple config files for the same layer; using the first"
            );
        }
        Some(first)
    }

    /// Existing layer files, in merge order.
    pub fn layer_paths(&self) -> Vec<PathBuf> {
        let mut layers = Vec::new();
        layers.extend(self.find_layer("config"));
        layers.extend(self.find_layer("config.local"));
        for extra in &self.extra_layers {
            if extra.is_file() {
                layers.push(extra.clone());
            } else {
                tracing::warn!(path = %extra.display(), "Config layer not found; skipping");
            }
        }
        layers
    }

    /// Load and merge every layer into a single value.
    pub fn resolve_value(&self) -> Result<Value> {
        let mut values = Vec::new();
        for (index, path) in self.layer_paths().into_iter().enumerate() {
            tracing::debug!(layer = index + 1, path = %path.display(), "Loading config layer");
            let value: Value = self.store.load(&path)?;
            if !value.is_object() {
                return Err(Error::invalid_config(format!(
                    "{} must contain a mapping at the top level",
                    path.display()
                )));
            }
            values.push(value);
        }
        if values.is_empty() {
            tracing::debug!(dir = %self.config_dir.display(), "No config layers found");
        }
        Ok(merge_layers(values))
    }

    /// Resolve the effective configuration.
    pub fn resolve(&self) -> Result<BlackbookConfig> {
        BlackbookConfig::from_value(self.resolve_value()?)
    }
}
