//! Directory-tree sync module
//!
//! Two trees are in sync when they hold the same relative file paths with the
//! same bytes. Empty directories do not count towards equality, but apply
//! mirrors them so the destination ends up with the origin's exact layout.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use blackbook_fs::tree::{list_dirs, list_files};
use blackbook_fs::{NormalizedPath, io};

use super::diff::unified_diff;
use super::module::{ApplyOutcome, Direction, SyncCheck, SyncModule, SyncRequest, origin_missing};
use super::status::SyncStatus;
use crate::asset::AssetKind;
use crate::{Error, Result};

/// Syncs a directory tree as a full mirror.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectorySync;

/// Differences between two trees, by relative path.
#[derive(Debug, Default)]
struct TreeComparison {
    only_in_source: Vec<NormalizedPath>,
    only_in_target: Vec<NormalizedPath>,
    differing: Vec<NormalizedPath>,
}

impl TreeComparison {
    fn compare(source: &Path, target: &Path) -> Result<Self> {
        let source_files = list_files(source)?;
        let target_files = list_files(target)?;

        let mut out = Self {
            only_in_source: source_files.difference(&target_files).cloned().collect(),
            only_in_target: target_files.difference(&source_files).cloned().collect(),
            differing: Vec::new(),
        };
        for rel in source_files.intersection(&target_files) {
            let native = rel.to_native();
            if io::read_bytes(&source.join(&native))? != io::read_bytes(&target.join(&native))? {
                out.differing.push(rel.clone());
            }
        }
        Ok(out)
    }

    fn is_empty(&self) -> bool {
        self.only_in_source.is_empty() && self.only_in_target.is_empty() && self.differing.is_empty()
    }

    fn summary(&self) -> String {
        let mut parts = Vec::new();
        match self.differing.len() {
            0 => {}
            1 => parts.push("1 differing file".to_string()),
            n => parts.push(format!("{n} differing files")),
        }
        if !self.only_in_source.is_empty() {
            parts.push(format!("{} only in source", self.only_in_source.len()));
        }
        if !self.only_in_target.is_empty() {
            parts.push(format!("{} only in target", self.only_in_target.len()));
        }
        parts.join(", ")
    }

    fn render(&self, source: &Path, target: &Path) -> Result<String> {
        let mut out = String::new();
        for rel in &self.only_in_source {
            out.push_str(&format!("Only in source: {rel}\n"));
        }
        for rel in &self.only_in_target {
            out.push_str(&format!("Only in target: {rel}\n"));
        }
        for rel in &self.differing {
            let native = rel.to_native();
            let old = io::read_bytes(&target.join(&native))?;
            let new = io::read_bytes(&source.join(&native))?;
            out.push_str(&unified_diff(rel.as_str(), &old, &new));
        }
        Ok(out)
    }
}

impl SyncModule for DirectorySync {
    fn kind(&self) -> AssetKind {
        AssetKind::Directory
    }

    fn check(&self, request: &SyncRequest<'_>) -> Result<SyncCheck> {
        if !request.source.exists() {
            return Ok(SyncCheck::new(SyncStatus::Failed, "source not found"));
        }
        if !request.source.is_dir() {
            return Ok(SyncCheck::new(
                SyncStatus::Failed,
                "source is a file, expected a directory",
            ));
        }
        if !request.target.exists() {
            return Ok(SyncCheck::new(SyncStatus::Missing, "target not found"));
        }
        if !request.target.is_dir() {
            return Ok(SyncCheck::new(
                SyncStatus::Drifted,
                "target is a file, expected a directory",
            ));
        }

        let comparison = TreeComparison::compare(request.source, request.target)?;
        if comparison.is_empty() {
            return Ok(SyncCheck::new(SyncStatus::Ok, "in sync"));
        }
        Ok(SyncCheck::drifted(
            comparison.summary(),
            comparison.render(request.source, request.target)?,
        ))
    }

    fn apply(&self, request: &SyncRequest<'_>, direction: Direction) -> Result<ApplyOutcome> {
        let (from, to) = request.endpoints(direction);
        if !from.exists() {
            return Err(origin_missing(direction, from));
        }
        if !from.is_dir() {
            return Err(Error::invalid_config(format!(
                "{} is a file, expected a directory",
                from.display()
            )));
        }

        let changed = mirror(from, to)?;
        if changed {
            tracing::info!(
                owner = request.owner,
                from = %from.display(),
                to = %to.display(),
                %direction,
                "Mirrored directory"
            );
        }
        Ok(ApplyOutcome { changed })
    }
}

/// Make `to` an exact copy of `from`. Returns whether anything changed.
fn mirror(from: &Path, to: &Path) -> Result<bool> {
    let fs_err = |path: &Path, e| Error::from(blackbook_fs::Error::io(path, e));
    let mut changed = false;

    if to.exists() && !to.is_dir() {
        fs::remove_file(to).map_err(|e| fs_err(to, e))?;
        changed = true;
    }
    if !to.exists() {
        fs::create_dir_all(to).map_err(|e| fs_err(to, e))?;
        changed = true;
    }

    let from_files = list_files(from)?;
    let from_dirs = list_dirs(from)?;
    let to_files = list_files(to)?;
    let to_dirs = list_dirs(to)?;

    for rel in to_files.difference(&from_files) {
        let path = to.join(rel.to_native());
        fs::remove_file(&path).map_err(|e| fs_err(&path, e))?;
        tracing::debug!(path = %path.display(), "Removed file not in origin");
        changed = true;
    }

    // Reverse order visits children before their parents
    let stale_dirs: BTreeSet<_> = to_dirs.difference(&from_dirs).collect();
    for rel in stale_dirs.into_iter().rev() {
        let path = to.join(rel.to_native());
        if path.exists() {
            fs::remove_dir_all(&path).map_err(|e| fs_err(&path, e))?;
            changed = true;
        }
    }

    for rel in &from_dirs {
        let path = to.join(rel.to_native());
        if !path.is_dir() {
            fs::create_dir_all(&path).map_err(|e| fs_err(&path, e))?;
            changed = true;
        }
    }

    for rel in &from_files {
        let native = rel.to_native();
        let content = io::read_bytes(&from.join(&native))?;
        let dest = to.join(&native);
        if dest.is_file() && io::read_bytes(&dest)? == content {
            continue;
        }
        io::write_atomic(&dest, &content)?;
        changed = true;
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn check(source: &Path, target: &Path) -> SyncCheck {
        DirectorySync
            .check(&SyncRequest::new(source, target, "claude:default"))
            .unwrap()
    }

    #[test]
    fn absent_target_is_missing() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        write(&src, "a.md", "a");
        assert_eq!(check(&src, &dir.path().join("dst")).status, SyncStatus::Missing);
    }

    #[test]
    fn absent_source_is_failed() {
        let dir = tempdir().unwrap();
        let result = check(&dir.path().join("src"), &dir.path().join("dst"));
        assert_eq!(result.status, SyncStatus::Failed);
        assert_eq!(result.message, "source not found");
    }

    #[test]
    fn identical_trees_are_ok() {
        let dir = tempdir().unwrap();
        let (src, dst) = (dir.path().join("src"), dir.path().join("dst"));
        for root in [&src, &dst] {
            write(root, "a.md", "a");
            write(root, "nested/b.md", "b");
        }
        std::fs::create_dir_all(dst.join("empty")).unwrap();

        assert_eq!(check(&src, &dst).status, SyncStatus::Ok);
    }

    #[test]
    fn content_and_membership_differences_are_drift() {
        let dir = tempdir().unwrap();
        let (src, dst) = (dir.path().join("src"), dir.path().join("dst"));
        write(&src, "same.md", "x");
        write(&dst, "same.md", "x");
        write(&src, "changed.md", "new\n");
        write(&dst, "changed.md", "old\n");
        write(&src, "added.md", "+");
        write(&dst, "extra.md", "-");

        let result = check(&src, &dst);
        assert_eq!(result.status, SyncStatus::Drifted);
        assert_eq!(
            result.message,
            "1 differing file, 1 only in source, 1 only in target"
        );
        let diff = result.diff.unwrap();
        assert!(diff.contains("Only in source: added.md"));
        assert!(diff.contains("Only in target: extra.md"));
        assert!(diff.contains("--- a/changed.md"));
        assert!(diff.contains("+new"));
    }

    #[test]
    fn source_only_file_is_drift() {
        let dir = tempdir().unwrap();
        let (src, dst) = (dir.path().join("src"), dir.path().join("dst"));
        write(&src, "a.md", "a");
        write(&src, "b.md", "b");
        write(&dst, "a.md", "a");

        assert_eq!(check(&src, &dst).status, SyncStatus::Drifted);
    }

    #[test]
    fn empty_source_creates_target() {
        let dir = tempdir().unwrap();
        let (src, dst) = (dir.path().join("src"), dir.path().join("dst"));
        std::fs::create_dir(&src).unwrap();

        let outcome = DirectorySync
            .apply(&SyncRequest::new(&src, &dst, "claude:default"), Direction::Forward)
            .unwrap();
        assert!(outcome.changed);
        assert!(dst.is_dir());
    }

    #[test]
    fn apply_mirrors_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let (src, dst) = (dir.path().join("src"), dir.path().join("dst"));
        write(&src, "a.md", "a2");
        write(&src, "deep/b.md", "b");
        std::fs::create_dir_all(src.join("keep-empty")).unwrap();
        write(&dst, "a.md", "a1");
        write(&dst, "stale.md", "gone");
        write(&dst, "old/dir/c.md", "gone");
        let request = SyncRequest::new(&src, &dst, "claude:default");

        assert!(DirectorySync.apply(&request, Direction::Forward).unwrap().changed);

        let files: Vec<_> = list_files(&dst)
            .unwrap()
            .into_iter()
            .map(|p| p.as_str().to_string())
            .collect();
        assert_eq!(files, vec!["a.md", "deep/b.md"]);
        assert_eq!(std::fs::read_to_string(dst.join("a.md")).unwrap(), "a2");
        assert!(dst.join("keep-empty").is_dir());
        assert!(!dst.join("old").exists());

        assert!(!DirectorySync.apply(&request, Direction::Forward).unwrap().changed);
        assert_eq!(DirectorySync.check(&request).unwrap().status, SyncStatus::Ok);
    }

    #[test]
    fn pullback_mirrors_target_into_source() {
        let dir = tempdir().unwrap();
        let (src, dst) = (dir.path().join("src"), dir.path().join("dst"));
        write(&src, "a.md", "a");
        write(&dst, "a.md", "edited");
        write(&dst, "new.md", "n");

        let request = SyncRequest::new(&src, &dst, "claude:default");
        assert!(DirectorySync.apply(&request, Direction::Pullback).unwrap().changed);
        assert_eq!(std::fs::read_to_string(src.join("a.md")).unwrap(), "edited");
        assert!(src.join("new.md").is_file());
    }

    #[test]
    fn file_replaced_by_directory_and_back() {
        let dir = tempdir().unwrap();
        let (src, dst) = (dir.path().join("src"), dir.path().join("dst"));
        write(&src, "x/inner.md", "i");
        write(&dst, "x", "was a file");
        let request = SyncRequest::new(&src, &dst, "claude:default");

        DirectorySync.apply(&request, Direction::Forward).unwrap();
        assert!(dst.join("x/inner.md").is_file());
    }

    #[test]
    fn missing_origin_is_an_error() {
        let dir = tempdir().unwrap();
        let (src, dst) = (dir.path().join("src"), dir.path().join("dst"));
        let request = SyncRequest::new(&src, &dst, "claude:default");

        assert!(matches!(
            DirectorySync.apply(&request, Direction::Forward).unwrap_err(),
            Error::SourceMissing { .. }
        ));
        assert!(!dst.exists());
    }
}
