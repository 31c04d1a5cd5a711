//! Status and drift classification
//!
//! For every asset and every instance it applies to, the classifier runs the
//! asset's sync module and compares current fingerprints against the
//! manifest baseline to decide which side drifted. Classification is
//! read-only; assets are classified concurrently on rayon's bounded pool.

use std::path::PathBuf;

use blackbook_fs::checksum::fingerprint;
use rayon::prelude::*;

use super::module::{SyncRequest, module_for};
use super::status::{DriftKind, FileInstanceStatus, FileStatus, SyncStatus};
use crate::asset::{AssetKind, Instance, ResolvedAsset, SourceLocation, expand};
use crate::config::BlackbookConfig;
use crate::manifest::{InstalledItem, Manifest};
use crate::Result;

/// Fingerprints of both sides of a pair at classification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprints {
    pub source: String,
    pub target: String,
}

/// One asset/instance pair with everything needed to act on it.
#[derive(Debug, Clone)]
pub struct PairState {
    pub asset: String,
    pub kind: AssetKind,
    pub instance: Instance,
    /// `None` for remote or unmatched sources
    pub source: Option<PathBuf>,
    pub target: PathBuf,
    pub status: FileInstanceStatus,
    /// Present when both sides exist and could be read
    pub fingerprints: Option<Fingerprints>,
    pub baseline: Option<InstalledItem>,
}

impl PairState {
    pub fn tool_id(&self) -> String {
        self.instance.key()
    }

    pub fn item_id(&self) -> String {
        Manifest::item_id(&self.asset)
    }

    /// Whether the recorded baseline equals the current fingerprints.
    pub fn baseline_current(&self) -> bool {
        match (&self.baseline, &self.fingerprints) {
            (Some(baseline), Some(fp)) => baseline.matches(&fp.source, &fp.target),
            _ => false,
        }
    }
}

/// Classification of one (possibly glob-derived) asset.
#[derive(Debug, Clone)]
pub struct AssetReport {
    pub name: String,
    pub kind: AssetKind,
    pub source: String,
    pub target: String,
    pub tools: Vec<String>,
    pub pairs: Vec<PairState>,
}

impl AssetReport {
    pub fn file_status(&self) -> FileStatus {
        FileStatus {
            name: self.name.clone(),
            kind: self.kind,
            source: self.source.clone(),
            target: self.target.clone(),
            tools: self.tools.clone(),
            instances: self.pairs.iter().map(|p| p.status.clone()).collect(),
        }
    }
}

/// Result of classifying every configured asset.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub assets: Vec<AssetReport>,
}

impl Classification {
    pub fn file_statuses(&self) -> Vec<FileStatus> {
        self.assets.iter().map(AssetReport::file_status).collect()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &PairState> {
        self.assets.iter().flat_map(|a| a.pairs.iter())
    }

    /// Reports for `name` and for assets derived from it by a glob.
    pub fn for_asset<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a AssetReport> {
        self.assets.iter().filter(move |a| {
            a.name == name
                || a.name
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

/// Classifies assets against the manifest.
pub struct Classifier<'a> {
    config: &'a BlackbookConfig,
    manifest: &'a Manifest,
    instances: Vec<Instance>,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a BlackbookConfig, manifest: &'a Manifest) -> Self {
        Self {
            config,
            manifest,
            instances: config.instances(),
        }
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Classify every asset in the configuration.
    pub fn classify_all(&self) -> Classification {
        let resolved: Vec<ResolvedAsset> = self
            .config
            .files
            .iter()
            .flat_map(|asset| match expand(asset, self.config.source_repo()) {
                Ok(expanded) => expanded,
                Err(e) => {
                    tracing::warn!(asset = %asset.name, error = %e, "Could not resolve asset");
                    vec![ResolvedAsset::unresolved(asset, e.to_string())]
                }
            })
            .collect();

        let assets = resolved
            .par_iter()
            .map(|asset| self.classify(asset))
            .collect();
        Classification { assets }
    }

    /// Classify one resolved asset across the instances it applies to.
    pub fn classify(&self, asset: &ResolvedAsset) -> AssetReport {
        let pairs = self
            .instances
            .iter()
            .filter(|instance| asset.applies_to(instance))
            .map(|instance| self.classify_pair(asset, instance))
            .collect();

        AssetReport {
            name: asset.name.clone(),
            kind: asset.kind,
            source: asset.source_display(),
            target: asset.entry.target.clone(),
            tools: self
                .instances
                .iter()
                .filter(|i| asset.applies_to(i))
                .map(|i| i.tool.clone())
                .fold(Vec::new(), |mut tools, tool| {
                    if !tools.contains(&tool) {
                        tools.push(tool);
                    }
                    tools
                }),
            pairs,
        }
    }

    fn classify_pair(&self, asset: &ResolvedAsset, instance: &Instance) -> PairState {
        let target = asset.target_for(instance);
        let owner = instance.key();
        let baseline = self
            .manifest
            .get(&owner, &Manifest::item_id(&asset.name))
            .cloned();
        let mut pair = PairState {
            asset: asset.name.clone(),
            kind: asset.kind,
            instance: instance.clone(),
            source: asset.source_path().map(PathBuf::from),
            target: target.clone(),
            status: FileInstanceStatus::new(
                &owner,
                SyncStatus::Failed,
                "",
                asset.source_display(),
                target.display().to_string(),
            ),
            fingerprints: None,
            baseline,
        };

        let message = match &asset.source {
            SourceLocation::Remote(_) => Some("remote sources must be fetched before syncing"),
            SourceLocation::Unmatched(_) => Some("source pattern matched nothing"),
            SourceLocation::Invalid { message, .. } => Some(message.as_str()),
            SourceLocation::Local(_) => None,
        };
        if let Some(message) = message {
            pair.status = self.status(&pair, SyncStatus::Failed, message);
            return pair;
        }

        match self.check_pair(&mut pair) {
            Ok(()) => {}
            Err(e) => {
                tracing::debug!(asset = %asset.name, owner = %owner, error = %e, "Check failed");
                pair.fingerprints = None;
                pair.status = self.status(&pair, SyncStatus::Failed, &e.to_string());
            }
        }
        pair
    }

    fn check_pair(&self, pair: &mut PairState) -> Result<()> {
        let Some(source) = pair.source.as_deref() else {
            return Ok(());
        };
        let owner = pair.instance.key();
        let request = SyncRequest::new(source, &pair.target, &owner);
        let check = module_for(pair.kind).check(&request)?;

        if matches!(check.status, SyncStatus::Ok | SyncStatus::Drifted) {
            let source_fp = fingerprint(source)?;
            let target_fp = fingerprint(&pair.target)?;
            if let (Some(source), Some(target)) = (source_fp, target_fp) {
                pair.fingerprints = Some(Fingerprints { source, target });
            }
        }

        let drift_kind = match (check.status, &pair.baseline, &pair.fingerprints) {
            (SyncStatus::Drifted, Some(baseline), Some(fp)) => Some(drift_kind(baseline, fp)),
            _ => None,
        };

        pair.status = self
            .status(pair, check.status, &check.message)
            .with_diff(check.diff)
            .with_drift_kind(drift_kind);
        Ok(())
    }

    fn status(&self, pair: &PairState, status: SyncStatus, message: &str) -> FileInstanceStatus {
        FileInstanceStatus::new(
            pair.instance.key(),
            status,
            message,
            pair.status.source_path(),
            pair.status.target_path(),
        )
    }
}

/// Which side moved away from the baseline.
///
/// A drifted pair whose sides both still match the baseline cannot be
/// attributed to either side and is reported as a conflict.
pub fn drift_kind(baseline: &InstalledItem, current: &Fingerprints) -> DriftKind {
    let source_changed = baseline.source_fingerprint != current.source;
    let target_changed = baseline.target_fingerprint != current.target;
    match (source_changed, target_changed) {
        (true, false) => DriftKind::SourceChanged,
        (false, true) => DriftKind::TargetChanged,
        _ => DriftKind::BothChanged,
    }
}
