//! Manifest of installed items and their baselines
//!
//! The manifest records, per `tool:instance`, every item that has been
//! successfully applied at least once together with the fingerprints of
//! source and target at the last successful sync. It is the only history
//! Blackbook keeps.

mod store;

pub use store::{MANIFEST_FILE, ManifestStore};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::asset::AssetKind;

/// Current on-disk manifest format version
pub const MANIFEST_VERSION: u32 = 1;

fn default_version() -> u32 {
    MANIFEST_VERSION
}

/// Persisted record of installed items, keyed by tool id then item id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub tools: BTreeMap<String, ToolItems>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            tools: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolItems {
    #[serde(default)]
    pub items: BTreeMap<String, InstalledItem>,
}

/// One source/target pair as of its last successful sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledItem {
    pub kind: AssetKind,
    pub name: String,
    /// Resolved source path
    pub source: String,
    /// Resolved target path
    pub target: String,
    pub source_fingerprint: String,
    pub target_fingerprint: String,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InstalledItem {
    /// Whether the recorded baseline equals the given fingerprints.
    pub fn matches(&self, source_fingerprint: &str, target_fingerprint: &str) -> bool {
        self.source_fingerprint == source_fingerprint && self.target_fingerprint == target_fingerprint
    }
}

impl Manifest {
    /// Item id for an asset: `file:<asset name>`.
    pub fn item_id(asset_name: &str) -> String {
        format!("file:{asset_name}")
    }

    pub fn is_empty(&self) -> bool {
        self.tools.values().all(|t| t.items.is_empty())
    }

    pub fn get(&self, tool_id: &str, item_id: &str) -> Option<&InstalledItem> {
        self.tools.get(tool_id)?.items.get(item_id)
    }

    /// Record a successful apply, keeping the original install time of an
    /// existing item.
    pub fn record(&mut self, tool_id: &str, item_id: &str, mut item: InstalledItem) {
        let items = &mut self.tools.entry(tool_id.to_string()).or_default().items;
        if let Some(existing) = items.get(item_id) {
            item.installed_at = existing.installed_at;
        }
        items.insert(item_id.to_string(), item);
    }

    /// Remove an item; empty tool entries are dropped with it.
    pub fn remove(&mut self, tool_id: &str, item_id: &str) -> Option<InstalledItem> {
        let tool = self.tools.get_mut(tool_id)?;
        let removed = tool.items.remove(item_id);
        if tool.items.is_empty() {
            self.tools.remove(tool_id);
        }
        removed
    }
}
