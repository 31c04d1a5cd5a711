//! Typed view of the effective configuration

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::asset::{Asset, Instance};
use crate::{Error, Result};

/// How one-sided drift is handled during `resolve`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftPolicy {
    /// Every drifted pair is presented to the prompt
    #[default]
    Prompt,
    /// Source-changed goes forward and target-changed goes pullback unasked
    Auto,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base for relative asset sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_repo: Option<String>,

    /// Directory holding the manifest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,

    pub drift_policy: DriftPolicy,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            instances: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub config_dir: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// The effective configuration, produced by merging every layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackbookConfig {
    pub settings: Settings,

    /// Carried through for marketplace browsing; not interpreted here
    pub marketplaces: BTreeMap<String, Value>,

    pub tools: BTreeMap<String, ToolConfig>,

    pub files: Vec<Asset>,

    /// Carried through for plugin management; not interpreted here
    pub plugins: BTreeMap<String, Value>,
}

impl BlackbookConfig {
    /// Interpret a merged configuration value.
    pub fn from_value(value: Value) -> Result<Self> {
        let config: Self =
            serde_json::from_value(value).map_err(|e| Error::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for asset in &self.files {
            if asset.name.is_empty() {
                return Err(Error::invalid_config("file entry with an empty name"));
            }
            if !seen.insert(asset.name.as_str()) {
                return Err(Error::invalid_config(format!(
                    "duplicate file entry name: {}",
                    asset.name
                )));
            }
        }
        Ok(())
    }

    /// Directory holding the manifest.
    ///
    /// Defaults to `<platform cache dir>/blackbook`.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.settings.cache_dir {
            Some(spec) => Ok(blackbook_fs::resolve(spec, None)),
            None => dirs::cache_dir()
                .map(|d| d.join("blackbook"))
                .ok_or_else(|| {
                    Error::invalid_config("no platform cache directory; set settings.cache_dir")
                }),
        }
    }

    pub fn source_repo(&self) -> Option<&str> {
        self.settings.source_repo.as_deref()
    }

    /// Every enabled instance of every enabled tool, in tool order.
    ///
    /// A tool without declared instances gets a single implicit `default`
    /// instance rooted at `~/.<tool>`.
    pub fn instances(&self) -> Vec<Instance> {
        let mut out = Vec::new();
        for (tool, config) in self.tools.iter().filter(|(_, c)| c.enabled) {
            if config.instances.is_empty() {
                out.push(Instance::new(
                    tool,
                    "default",
                    tool,
                    blackbook_fs::resolve(&format!("~/.{tool}"), None),
                ));
                continue;
            }
            for instance in config.instances.iter().filter(|i| i.enabled) {
                out.push(Instance::new(
                    tool,
                    &instance.id,
                    instance.name.as_deref().unwrap_or(&instance.id),
                    blackbook_fs::resolve(&instance.config_dir, None),
                ));
            }
        }
        out
    }

    /// Find an instance by `tool:instance` key or bare instance id.
    pub fn find_instance(&self, name: &str) -> Result<Instance> {
        self.instances()
            .into_iter()
            .find(|i| i.key() == name || i.id == name)
            .ok_or_else(|| Error::UnknownInstance {
                name: name.to_string(),
            })
    }

    pub fn find_asset(&self, name: &str) -> Result<&Asset> {
        self.files
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| Error::UnknownAsset {
                name: name.to_string(),
            })
    }
}
