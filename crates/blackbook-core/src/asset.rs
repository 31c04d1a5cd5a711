//! Assets, instances, and their resolution to concrete paths
//!
//! An [`Asset`] is a declaration from the `files` section. Before anything is
//! checked or applied it is expanded into one or more [`ResolvedAsset`]s:
//! glob sources fan out into one derived asset per match, URL sources stay
//! remote, and the kind is fixed once per run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use blackbook_fs::{NormalizedPath, is_glob, is_url, resolve};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Whether an asset is a single file or a directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    File,
    Directory,
}

impl AssetKind {
    /// `Directory` if `path` is a directory on disk, `File` otherwise.
    pub fn infer(path: &Path) -> Self {
        if path.is_dir() {
            Self::Directory
        } else {
            Self::File
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Directory => write!(f, "directory"),
        }
    }
}

/// A named source-to-target sync declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,

    /// Path spec or URL, possibly a glob
    pub source: String,

    /// Target spec, relative to each instance's config directory
    #[serde(alias = "defaultTarget", alias = "default_target")]
    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AssetKind>,

    /// Restrict to these tool ids; all enabled tools when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,

    /// Target overrides keyed by `tool:instance` or bare instance id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, String>,
}

impl Asset {
    pub fn applies_to(&self, instance: &Instance) -> bool {
        self.tools
            .as_ref()
            .is_none_or(|tools| tools.iter().any(|t| *t == instance.tool))
    }

    /// The target spec for `instance`, honoring overrides.
    pub fn target_spec_for(&self, instance: &Instance) -> &str {
        self.overrides
            .get(&instance.key())
            .or_else(|| self.overrides.get(&instance.id))
            .unwrap_or(&self.target)
    }

    pub fn target_for(&self, instance: &Instance) -> PathBuf {
        let base = instance.config_dir.to_string_lossy();
        resolve(self.target_spec_for(instance), Some(base.as_ref()))
    }
}

/// A named target environment with its own config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    pub tool: String,
    pub id: String,
    pub name: String,
    pub config_dir: PathBuf,
}

impl Instance {
    pub fn new(tool: &str, id: &str, name: &str, config_dir: PathBuf) -> Self {
        Self {
            tool: tool.to_string(),
            id: id.to_string(),
            name: name.to_string(),
            config_dir,
        }
    }

    /// `tool:instance`, the manifest tool id.
    pub fn key(&self) -> String {
        format!("{}:{}", self.tool, self.id)
    }
}

/// Where the content of a resolved asset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Local(PathBuf),
    /// A URL; must be fetched before it can be synced
    Remote(String),
    /// A glob that matched nothing
    Unmatched(String),
    /// The source spec could not be resolved
    Invalid { spec: String, message: String },
}

/// An asset with its source resolved and its kind fixed for this run.
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    /// Asset name, or `<asset>/<path below the pattern's literal prefix>`
    /// for a glob match
    pub name: String,
    pub entry: Asset,
    pub source: SourceLocation,
    pub kind: AssetKind,
    /// Relative path appended to the target for glob matches
    member: Option<String>,
}

impl ResolvedAsset {
    /// Placeholder for an asset whose source could not be resolved.
    pub fn unresolved(asset: &Asset, message: impl Into<String>) -> Self {
        Self {
            name: asset.name.clone(),
            entry: asset.clone(),
            source: SourceLocation::Invalid {
                spec: asset.source.clone(),
                message: message.into(),
            },
            kind: asset.kind.unwrap_or(AssetKind::File),
            member: None,
        }
    }

    pub fn source_path(&self) -> Option<&Path> {
        match &self.source {
            SourceLocation::Local(path) => Some(path),
            _ => None,
        }
    }

    pub fn source_display(&self) -> String {
        match &self.source {
            SourceLocation::Local(path) => path.display().to_string(),
            SourceLocation::Remote(url) => url.clone(),
            SourceLocation::Unmatched(pattern) => pattern.clone(),
            SourceLocation::Invalid { spec, .. } => spec.clone(),
        }
    }

    pub fn target_for(&self, instance: &Instance) -> PathBuf {
        let target = self.entry.target_for(instance);
        match &self.member {
            Some(member) => target.join(member),
            None => target,
        }
    }

    pub fn applies_to(&self, instance: &Instance) -> bool {
        self.entry.applies_to(instance)
    }
}

/// Expand `asset` into the concrete assets it stands for.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for a malformed glob pattern.
pub fn expand(asset: &Asset, source_repo: Option<&str>) -> Result<Vec<ResolvedAsset>> {
    let resolved = |name: String, source: SourceLocation, kind: AssetKind, member: Option<String>| {
        ResolvedAsset {
            name,
            entry: asset.clone(),
            source,
            kind,
            member,
        }
    };
    let declared_kind = asset.kind.unwrap_or(AssetKind::File);

    if is_url(&asset.source) {
        let source = SourceLocation::Remote(asset.source.clone());
        return Ok(vec![resolved(asset.name.clone(), source, declared_kind, None)]);
    }

    let path = resolve(&asset.source, source_repo);
    if !is_glob(&asset.source) {
        let kind = asset.kind.unwrap_or_else(|| AssetKind::infer(&path));
        tracing::debug!(asset = %asset.name, source = %path.display(), %kind, "Resolved asset");
        return Ok(vec![resolved(
            asset.name.clone(),
            SourceLocation::Local(path),
            kind,
            None,
        )]);
    }

    let pattern = path.to_string_lossy().into_owned();
    let matches = glob::glob(&pattern).map_err(|e| {
        Error::invalid_config(format!("invalid source pattern {pattern} for {}: {e}", asset.name))
    })?;
    let prefix = literal_prefix(&path);

    let mut out: Vec<ResolvedAsset> = Vec::new();
    for entry in matches {
        let matched = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(asset = %asset.name, error = %e, "Skipping unreadable glob match");
                continue;
            }
        };
        let Some(member) = member_path(&matched, &prefix) else {
            continue;
        };
        let name = format!("{}/{}", asset.name, member);
        if out.iter().any(|existing| existing.name == name) {
            return Err(Error::invalid_config(format!(
                "source pattern {pattern} yields {name} more than once"
            )));
        }
        let kind = asset.kind.unwrap_or_else(|| AssetKind::infer(&matched));
        out.push(resolved(name, SourceLocation::Local(matched), kind, Some(member)));
    }

    tracing::debug!(asset = %asset.name, %pattern, matches = out.len(), "Expanded glob source");
    if out.is_empty() {
        out.push(resolved(
            asset.name.clone(),
            SourceLocation::Unmatched(pattern),
            declared_kind,
            None,
        ));
    }
    Ok(out)
}

/// Leading components of a glob pattern that contain no metacharacters.
fn literal_prefix(pattern: &Path) -> PathBuf {
    pattern
        .components()
        .take_while(|c| !is_glob(&c.as_os_str().to_string_lossy()))
        .collect()
}

/// `matched` relative to `prefix`, slash-separated.
fn member_path(matched: &Path, prefix: &Path) -> Option<String> {
    let relative = matched.strip_prefix(prefix).ok()?;
    let member = relative
        .components()
        .fold(NormalizedPath::new(""), |acc, c| {
            acc.join(&c.as_os_str().to_string_lossy())
        });
    (!member.as_str().is_empty()).then(|| member.as_str().to_string())
}
