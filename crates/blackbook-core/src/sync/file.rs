//! Single-file sync module

use std::fs;
use std::path::Path;

use blackbook_fs::io;

use super::diff::unified_diff;
use super::module::{ApplyOutcome, Direction, SyncCheck, SyncModule, SyncRequest, origin_missing};
use super::status::SyncStatus;
use crate::asset::AssetKind;
use crate::{Error, Result};

/// Syncs one file by byte comparison.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSync;

fn label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl SyncModule for FileSync {
    fn kind(&self) -> AssetKind {
        AssetKind::File
    }

    /// The diff of a drifted pair goes from target to source: `+` lines are
    /// what a forward apply would write.
    fn check(&self, request: &SyncRequest<'_>) -> Result<SyncCheck> {
        if !request.source.exists() {
            return Ok(SyncCheck::new(SyncStatus::Failed, "source not found"));
        }
        if request.source.is_dir() {
            return Ok(SyncCheck::new(
                SyncStatus::Failed,
                "source is a directory, expected a file",
            ));
        }
        if !request.target.exists() {
            return Ok(SyncCheck::new(SyncStatus::Missing, "target not found"));
        }
        if request.target.is_dir() {
            return Ok(SyncCheck::new(
                SyncStatus::Drifted,
                "target is a directory, expected a file",
            ));
        }

        let source = io::read_bytes(request.source)?;
        let target = io::read_bytes(request.target)?;
        if source == target {
            return Ok(SyncCheck::new(SyncStatus::Ok, "in sync"));
        }
        Ok(SyncCheck::drifted(
            "content differs",
            unified_diff(&label(request.target), &target, &source),
        ))
    }

    fn apply(&self, request: &SyncRequest<'_>, direction: Direction) -> Result<ApplyOutcome> {
        let (from, to) = request.endpoints(direction);
        if !from.exists() {
            return Err(origin_missing(direction, from));
        }
        if from.is_dir() {
            return Err(Error::invalid_config(format!(
                "{} is a directory, expected a file",
                from.display()
            )));
        }

        let content = io::read_bytes(from)?;
        if to.is_dir() {
            fs::remove_dir_all(to).map_err(|e| blackbook_fs::Error::io(to, e))?;
        } else if to.exists() && io::read_bytes(to)? == content {
            return Ok(ApplyOutcome { changed: false });
        }

        io::write_atomic(to, &content)?;
        tracing::info!(
            owner = request.owner,
            from = %from.display(),
            to = %to.display(),
            %direction,
            "Applied file"
        );
        Ok(ApplyOutcome { changed: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case(Some("same"), Some("same"), SyncStatus::Ok)]
    #[case(Some("new"), Some("old"), SyncStatus::Drifted)]
    #[case(Some("x"), None, SyncStatus::Missing)]
    #[case(None, Some("x"), SyncStatus::Failed)]
    #[case(None, None, SyncStatus::Failed)]
    fn check_classifies(
        #[case] source: Option<&str>,
        #[case] target: Option<&str>,
        #[case] expected: SyncStatus,
    ) {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.md");
        let dst = dir.path().join("dst.md");
        if let Some(content) = source {
            std::fs::write(&src, content).unwrap();
        }
        if let Some(content) = target {
            std::fs::write(&dst, content).unwrap();
        }

        let check = FileSync
            .check(&SyncRequest::new(&src, &dst, "claude:default"))
            .unwrap();
        assert_eq!(check.status, expected);
        assert_eq!(check.diff.is_some(), expected == SyncStatus::Drifted);
    }

    #[test]
    fn check_never_mutates() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.md");
        let dst = dir.path().join("dst.md");
        std::fs::write(&src, "a\n").unwrap();

        FileSync
            .check(&SyncRequest::new(&src, &dst, "claude:default"))
            .unwrap();
        assert!(!dst.exists());
    }

    #[test]
    fn apply_forward_then_noop() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.md");
        let dst = dir.path().join("nested/dst.md");
        std::fs::write(&src, "content\n").unwrap();
        let request = SyncRequest::new(&src, &dst, "claude:default");

        assert!(FileSync.apply(&request, Direction::Forward).unwrap().changed);
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "content\n");
        assert!(!FileSync.apply(&request, Direction::Forward).unwrap().changed);
    }

    #[test]
    fn apply_pullback_copies_target_to_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.md");
        let dst = dir.path().join("dst.md");
        std::fs::write(&src, "old\n").unwrap();
        std::fs::write(&dst, "edited\n").unwrap();

        let outcome = FileSync
            .apply(&SyncRequest::new(&src, &dst, "claude:default"), Direction::Pullback)
            .unwrap();
        assert!(outcome.changed);
        assert_eq!(std::fs::read_to_string(&src).unwrap(), "edited\n");
    }

    #[test]
    fn apply_with_missing_origin_fails() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.md");
        let dst = dir.path().join("dst.md");
        let request = SyncRequest::new(&src, &dst, "claude:default");

        assert!(matches!(
            FileSync.apply(&request, Direction::Forward).unwrap_err(),
            Error::SourceMissing { .. }
        ));
        assert!(matches!(
            FileSync.apply(&request, Direction::Pullback).unwrap_err(),
            Error::TargetMissing { .. }
        ));
    }

    #[test]
    fn apply_replaces_directory_at_target() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.md");
        let dst = dir.path().join("dst.md");
        std::fs::write(&src, "file\n").unwrap();
        std::fs::create_dir_all(dst.join("inner")).unwrap();
        let request = SyncRequest::new(&src, &dst, "claude:default");

        assert_eq!(FileSync.check(&request).unwrap().status, SyncStatus::Drifted);
        assert!(FileSync.apply(&request, Direction::Forward).unwrap().changed);
        assert!(dst.is_file());
    }
}
