//! SyncEngine implementation
//!
//! The SyncEngine ties classification, the sync modules, the conflict
//! protocol and the manifest together. Every operation classifies first,
//! acts on the result, and folds all of its manifest changes into a single
//! locked update at the end.

use chrono::Utc;
use serde::Serialize;

use blackbook_fs::checksum::fingerprint;
use blackbook_fs::io;

use super::classifier::{Classification, Classifier, Fingerprints, PairState};
use super::conflict::{Conflict, ConflictAction, ConflictPrompt, policy_action};
use super::module::{ApplyOutcome, Direction, SyncRequest, module_for};
use super::status::{DriftKind, FileStatus, SyncStatus};
use crate::config::BlackbookConfig;
use crate::manifest::{InstalledItem, Manifest, ManifestStore};
use crate::{Error, Result};

/// Report from a sync, resolve or uninstall operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Whether the operation completed without errors
    pub success: bool,
    /// Actions taken during the operation
    pub actions: Vec<String>,
    /// Drifted pairs left for the conflict protocol
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drifted: Vec<String>,
    /// Decisions taken by `resolve`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resolutions: Vec<Resolution>,
    /// Errors encountered during the operation
    pub errors: Vec<String>,
}

impl SyncReport {
    /// Create a successful sync report
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn error(&mut self, error: String) {
        tracing::warn!("{error}");
        self.errors.push(error);
        self.success = false;
    }
}

/// Options for sync operations
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// If true, simulate changes without modifying the filesystem.
    /// Actions will be prefixed with "[dry-run] Would ..."
    pub dry_run: bool,
}

/// How a resolution was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecidedBy {
    Policy,
    Prompt,
    Caller,
}

/// Outcome of one pair passing through the conflict protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub asset: String,
    pub instance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift_kind: Option<DriftKind>,
    pub action: ConflictAction,
    pub decided_by: DecidedBy,
    /// False for skips and for pairs that were no longer drifted
    pub changed: bool,
}

/// A conflict decision waiting to be applied.
#[derive(Debug)]
struct Decision {
    asset: String,
    instance: String,
    /// Both sides as they were when the decision was taken
    seen: Option<Fingerprints>,
    action: ConflictAction,
    decided_by: DecidedBy,
}

/// Engine for synchronizing assets into tool instances
///
/// The SyncEngine provides the operations collaborators build on:
/// - **status**: Classify every asset/instance pair
/// - **sync**: Install missing targets and maintain baselines
/// - **resolve**: Drive drifted pairs through the conflict protocol
/// - **uninstall**: Remove an asset from every instance
pub struct SyncEngine {
    config: BlackbookConfig,
    store: ManifestStore,
}

impl SyncEngine {
    pub fn new(config: BlackbookConfig, store: ManifestStore) -> Self {
        Self { config, store }
    }

    /// Engine whose manifest lives in the configured cache directory.
    pub fn from_config(config: BlackbookConfig) -> Result<Self> {
        let store = ManifestStore::new(&config.cache_dir()?);
        Ok(Self::new(config, store))
    }

    pub fn config(&self) -> &BlackbookConfig {
        &self.config
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Classify every asset against the current manifest.
    ///
    /// # Errors
    ///
    /// Only manifest loading can fail; per-pair problems become `failed`
    /// statuses.
    pub fn classify(&self) -> Result<Classification> {
        let manifest = self.store.load()?;
        Ok(Classifier::new(&self.config, &manifest).classify_all())
    }

    /// Per-asset statuses for presentation.
    pub fn status(&self) -> Result<Vec<FileStatus>> {
        Ok(self.classify()?.file_statuses())
    }

    /// Install missing targets and keep baselines current.
    ///
    /// Drifted pairs are reported and left alone; they go through
    /// [`SyncEngine::resolve`].
    pub fn sync(&self, options: &SyncOptions) -> Result<SyncReport> {
        let report = self.locked(|classification, manifest| {
            let mut report = SyncReport::success();
            for pair in classification.pairs() {
                self.sync_pair(pair, options, manifest, &mut report);
            }
            Ok(report)
        })?;
        tracing::info!(
            actions = report.actions.len(),
            drifted = report.drifted.len(),
            errors = report.errors.len(),
            dry_run = options.dry_run,
            "Sync finished"
        );
        Ok(report)
    }

    fn sync_pair(
        &self,
        pair: &PairState,
        options: &SyncOptions,
        manifest: &mut Manifest,
        report: &mut SyncReport,
    ) {
        let label = pair_label(pair);
        match pair.status.status() {
            SyncStatus::Missing => {
                if options.dry_run {
                    report.actions.push(format!(
                        "[dry-run] Would install {label} to {}",
                        pair.target.display()
                    ));
                    return;
                }
                match self.apply_pair(pair, Direction::Forward) {
                    Ok((_, item)) => {
                        report
                            .actions
                            .push(format!("Installed {label} to {}", pair.target.display()));
                        record(manifest, pair, item);
                    }
                    Err(e) => report.error(format!("{label}: {e}")),
                }
            }
            SyncStatus::Ok => {
                if pair.baseline_current() {
                    return;
                }
                let verb = if pair.baseline.is_some() {
                    "refresh baseline for"
                } else {
                    "record baseline for"
                };
                if options.dry_run {
                    report.actions.push(format!("[dry-run] Would {verb} {label}"));
                    return;
                }
                // Both sides already agree, so the forward apply copies nothing
                match self.apply_pair(pair, Direction::Forward) {
                    Ok((_, item)) => {
                        report.actions.push(format!("{} {label}", capitalize(verb)));
                        record(manifest, pair, item);
                    }
                    Err(e) => report.error(format!("{label}: {e}")),
                }
            }
            SyncStatus::Drifted => {
                let kind = pair
                    .status
                    .drift_kind()
                    .map(|k| format!(" ({k})"))
                    .unwrap_or_default();
                report
                    .drifted
                    .push(format!("{label}: {}{kind}", pair.status.message()));
            }
            SyncStatus::Failed => {
                report.error(format!("{label}: {}", pair.status.message()));
            }
        }
    }

    /// Walk every drifted pair through the conflict protocol.
    ///
    /// The drift policy settles what it can; everything else is put to
    /// `prompt`. Decisions are collected first and then applied under one
    /// lock hold against a fresh classification; a pair that changed while
    /// its conflict was open is reported as an error and left alone. If the
    /// prompt fails, decisions taken before the failure are still applied
    /// before the error is returned.
    pub fn resolve(
        &self,
        prompt: &mut dyn ConflictPrompt,
        options: &SyncOptions,
    ) -> Result<SyncReport> {
        let classification = self.classify()?;
        let policy = self.config.settings.drift_policy;
        let mut decisions = Vec::new();
        let mut prompt_error = None;

        for pair in classification
            .pairs()
            .filter(|p| p.status.status() == SyncStatus::Drifted)
        {
            let drift_kind = pair.status.drift_kind();
            let (action, decided_by) = match policy_action(policy, drift_kind) {
                Some(action) => (action, DecidedBy::Policy),
                None => match prompt.decide(&conflict_for(pair)) {
                    Ok(action) => (action, DecidedBy::Prompt),
                    Err(e) => {
                        prompt_error = Some(e);
                        break;
                    }
                },
            };
            tracing::debug!(asset = %pair.asset, owner = %pair.tool_id(), %action, ?decided_by, "Conflict decided");
            decisions.push(Decision {
                asset: pair.asset.clone(),
                instance: pair.tool_id(),
                seen: pair.fingerprints.clone(),
                action,
                decided_by,
            });
        }

        let report = if decisions.is_empty() {
            SyncReport::success()
        } else {
            self.locked(|fresh, manifest| {
                let mut report = SyncReport::success();
                for decision in decisions {
                    let current = fresh
                        .pairs()
                        .find(|p| p.asset == decision.asset && p.tool_id() == decision.instance);
                    match current {
                        Some(pair)
                            if pair.status.status() == SyncStatus::Drifted
                                && pair.fingerprints == decision.seen =>
                        {
                            self.execute(
                                pair,
                                decision.action,
                                decision.decided_by,
                                options,
                                manifest,
                                &mut report,
                            );
                        }
                        _ => report.error(format!(
                            "{} ({}): changed while the conflict was open; run resolve again",
                            decision.asset, decision.instance
                        )),
                    }
                }
                Ok(report)
            })?
        };

        match prompt_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Resolve one pair with an explicit action.
    ///
    /// A pair that is no longer drifted is left alone and reported with
    /// `changed = false`.
    pub fn resolve_pair(
        &self,
        asset: &str,
        instance: &str,
        action: ConflictAction,
        options: &SyncOptions,
    ) -> Result<SyncReport> {
        let instance = self.config.find_instance(instance)?;
        self.locked(|classification, manifest| {
            let pair = classification
                .pairs()
                .find(|p| p.asset == asset && p.instance.key() == instance.key())
                .ok_or_else(|| Error::UnknownAsset {
                    name: format!("{asset} in {}", instance.key()),
                })?;

            let mut report = SyncReport::success();
            if pair.status.status() == SyncStatus::Drifted {
                self.execute(pair, action, DecidedBy::Caller, options, manifest, &mut report);
            } else {
                tracing::debug!(asset, owner = %pair.tool_id(), status = %pair.status.status(), "Pair no longer drifted");
                report.resolutions.push(Resolution {
                    asset: pair.asset.clone(),
                    instance: pair.tool_id(),
                    drift_kind: None,
                    action,
                    decided_by: DecidedBy::Caller,
                    changed: false,
                });
            }
            Ok(report)
        })
    }

    /// Remove an asset's targets from every instance and forget it.
    ///
    /// Only targets that still match their recorded baseline are removed.
    /// A target that was never installed, or that changed since it was,
    /// is reported as an error and left in place. Glob-derived assets
    /// (`<name>/<path>`) are removed with their parent.
    pub fn uninstall(&self, asset: &str, options: &SyncOptions) -> Result<SyncReport> {
        self.config.find_asset(asset)?;
        self.locked(|classification, manifest| {
            let mut report = SyncReport::success();
            for pair in classification.for_asset(asset).flat_map(|a| a.pairs.iter()) {
                self.uninstall_pair(pair, options, manifest, &mut report);
            }
            Ok(report)
        })
    }

    fn uninstall_pair(
        &self,
        pair: &PairState,
        options: &SyncOptions,
        manifest: &mut Manifest,
        report: &mut SyncReport,
    ) {
        let label = pair_label(pair);
        let current = match fingerprint(&pair.target) {
            Ok(current) => current,
            Err(e) => {
                report.error(format!("{label}: {e}"));
                return;
            }
        };

        match (current, &pair.baseline) {
            (None, baseline) => {
                if baseline.is_some() && !options.dry_run {
                    manifest.remove(&pair.tool_id(), &pair.item_id());
                }
            }
            (Some(current), Some(baseline)) if current == baseline.target_fingerprint => {
                if options.dry_run {
                    report.actions.push(format!(
                        "[dry-run] Would remove {}",
                        pair.target.display()
                    ));
                    return;
                }
                match io::remove(&pair.target) {
                    Ok(_) => {
                        report
                            .actions
                            .push(format!("Removed {label} from {}", pair.target.display()));
                        manifest.remove(&pair.tool_id(), &pair.item_id());
                    }
                    Err(e) => report.error(format!("{label}: {e}")),
                }
            }
            (Some(_), Some(_)) => report.error(format!(
                "{label}: {} changed since it was installed; resolve it before uninstalling",
                pair.target.display()
            )),
            (Some(_), None) => report.error(format!(
                "{label}: {} was not installed by blackbook; left in place",
                pair.target.display()
            )),
        }
    }

    fn execute(
        &self,
        pair: &PairState,
        action: ConflictAction,
        decided_by: DecidedBy,
        options: &SyncOptions,
        manifest: &mut Manifest,
        report: &mut SyncReport,
    ) {
        let label = pair_label(pair);
        let mut resolution = Resolution {
            asset: pair.asset.clone(),
            instance: pair.tool_id(),
            drift_kind: pair.status.drift_kind(),
            action,
            decided_by,
            changed: false,
        };

        let Some(direction) = action.direction() else {
            report.actions.push(format!("Skipped {label}"));
            report.resolutions.push(resolution);
            return;
        };

        if options.dry_run {
            report
                .actions
                .push(format!("[dry-run] Would {action} {label}"));
            report.resolutions.push(resolution);
            return;
        }

        match self.apply_pair(pair, direction) {
            Ok((outcome, item)) => {
                resolution.changed = outcome.changed;
                report.actions.push(format!("Applied {action} to {label}"));
                report.resolutions.push(resolution);
                record(manifest, pair, item);
            }
            Err(e) => report.error(format!("{label}: {e}")),
        }
    }

    /// Apply `pair` in `direction` and compute the new baseline.
    fn apply_pair(&self, pair: &PairState, direction: Direction) -> Result<(ApplyOutcome, InstalledItem)> {
        let source = pair.source.as_deref().ok_or_else(|| {
            Error::invalid_config(format!("{} has no local source", pair.asset))
        })?;
        let owner = pair.tool_id();
        let request = SyncRequest::new(source, &pair.target, &owner);
        let outcome = module_for(pair.kind).apply(&request, direction)?;

        let source_fingerprint = fingerprint(source)?.ok_or_else(|| Error::SourceMissing {
            path: source.to_path_buf(),
        })?;
        let target_fingerprint = fingerprint(&pair.target)?.ok_or_else(|| Error::TargetMissing {
            path: pair.target.clone(),
        })?;
        let now = Utc::now();
        let item = InstalledItem {
            kind: pair.kind,
            name: pair.asset.clone(),
            source: source.display().to_string(),
            target: pair.target.display().to_string(),
            source_fingerprint,
            target_fingerprint,
            installed_at: now,
            updated_at: now,
        };
        Ok((outcome, item))
    }

    /// Classify and act inside a single hold of the manifest lock.
    ///
    /// `f` sees the manifest loaded under that hold; it is saved only if
    /// `f` succeeds and changed it.
    fn locked<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Classification, &mut Manifest) -> Result<T>,
    {
        self.store.update(|manifest| {
            let classification = Classifier::new(&self.config, manifest).classify_all();
            f(&classification, manifest)
        })
    }
}

fn record(manifest: &mut Manifest, pair: &PairState, item: InstalledItem) {
    manifest.record(&pair.tool_id(), &pair.item_id(), item);
}

fn conflict_for(pair: &PairState) -> Conflict {
    Conflict {
        file_name: pair.asset.clone(),
        instance: pair.tool_id(),
        drift_kind: pair.status.drift_kind(),
        diff: pair.status.diff().map(str::to_string),
    }
}

fn pair_label(pair: &PairState) -> String {
    format!("{} ({})", pair.asset, pair.tool_id())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
