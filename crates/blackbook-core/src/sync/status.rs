//! Status types for classification results
//!
//! Statuses are derived on every run and never persisted.

use serde::Serialize;

use crate::asset::AssetKind;

/// Outcome of checking one source/target pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Target matches source
    Ok,
    /// Target does not exist
    Missing,
    /// Target differs from source
    Drifted,
    /// The pair cannot be checked (no source, remote source, I/O error)
    Failed,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::Missing => "missing",
            Self::Drifted => "drifted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Which side moved away from the last-synced baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriftKind {
    SourceChanged,
    TargetChanged,
    /// Both sides diverged: a true conflict
    BothChanged,
}

impl std::fmt::Display for DriftKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SourceChanged => "source-changed",
            Self::TargetChanged => "target-changed",
            Self::BothChanged => "both-changed",
        };
        f.write_str(s)
    }
}

/// Status of one asset in one instance.
///
/// `drift_kind` is only ever set on a drifted status; the constructors are
/// the only way to build one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInstanceStatus {
    instance_name: String,
    status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    drift_kind: Option<DriftKind>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<String>,
    source_path: String,
    target_path: String,
}

impl FileInstanceStatus {
    /// A non-drifted status. Passing [`SyncStatus::Drifted`] records it
    /// without a kind, which is only correct when there is no baseline.
    pub fn new(
        instance_name: impl Into<String>,
        status: SyncStatus,
        message: impl Into<String>,
        source_path: impl Into<String>,
        target_path: impl Into<String>,
    ) -> Self {
        Self {
            instance_name: instance_name.into(),
            status,
            drift_kind: None,
            message: message.into(),
            diff: None,
            source_path: source_path.into(),
            target_path: target_path.into(),
        }
    }

    pub fn with_diff(mut self, diff: Option<String>) -> Self {
        self.diff = diff;
        self
    }

    /// Attach a drift kind; ignored unless the status is drifted.
    pub fn with_drift_kind(mut self, kind: Option<DriftKind>) -> Self {
        if self.status == SyncStatus::Drifted {
            self.drift_kind = kind;
        }
        self
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn drift_kind(&self) -> Option<DriftKind> {
        self.drift_kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn diff(&self) -> Option<&str> {
        self.diff.as_deref()
    }

    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    pub fn target_path(&self) -> &str {
        &self.target_path
    }
}

/// Status of one asset across every instance it applies to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileStatus {
    pub name: String,
    pub kind: AssetKind,
    pub source: String,
    pub target: String,
    pub tools: Vec<String>,
    pub instances: Vec<FileInstanceStatus>,
}

impl FileStatus {
    /// At least one instance has something at the target.
    pub fn installed(&self) -> bool {
        self.instances
            .iter()
            .any(|i| i.status() != SyncStatus::Missing)
    }

    /// Installed somewhere but missing somewhere else.
    pub fn incomplete(&self) -> bool {
        self.installed()
            && self
                .instances
                .iter()
                .any(|i| i.status() == SyncStatus::Missing)
    }

    pub fn drifted(&self) -> bool {
        self.instances
            .iter()
            .any(|i| i.status() == SyncStatus::Drifted)
    }

    pub fn failed(&self) -> bool {
        self.instances
            .iter()
            .any(|i| i.status() == SyncStatus::Failed)
    }

    pub fn instance(&self, name: &str) -> Option<&FileInstanceStatus> {
        self.instances.iter().find(|i| i.instance_name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(instance: &str, status: SyncStatus) -> FileInstanceStatus {
        FileInstanceStatus::new(instance, status, "", "/src/a", "/t/a")
    }

    fn file(instances: Vec<FileInstanceStatus>) -> FileStatus {
        FileStatus {
            name: "a".into(),
            kind: AssetKind::File,
            source: "/src/a".into(),
            target: "a".into(),
            tools: vec!["claude".into()],
            instances,
        }
    }

    #[test]
    fn drift_kind_only_sticks_to_drifted() {
        let ok = status("claude:default", SyncStatus::Ok).with_drift_kind(Some(DriftKind::BothChanged));
        assert_eq!(ok.drift_kind(), None);

        let drifted = status("claude:default", SyncStatus::Drifted)
            .with_drift_kind(Some(DriftKind::SourceChanged));
        assert_eq!(drifted.drift_kind(), Some(DriftKind::SourceChanged));
    }

    #[test]
    fn aggregation_flags() {
        let all_missing = file(vec![
            status("claude:a", SyncStatus::Missing),
            status("claude:b", SyncStatus::Missing),
        ]);
        assert!(!all_missing.installed());
        assert!(!all_missing.incomplete());

        let partial = file(vec![
            status("claude:a", SyncStatus::Ok),
            status("claude:b", SyncStatus::Missing),
        ]);
        assert!(partial.installed());
        assert!(partial.incomplete());
        assert!(!partial.drifted());

        let drifted = file(vec![status("claude:a", SyncStatus::Drifted)]);
        assert!(drifted.installed());
        assert!(!drifted.incomplete());
        assert!(drifted.drifted());
    }

    #[test]
    fn drift_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&DriftKind::BothChanged).unwrap();
        assert_eq!(json, "\"both-changed\"");
    }
}
