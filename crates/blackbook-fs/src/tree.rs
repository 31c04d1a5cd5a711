//! Directory tree enumeration

use std::collections::BTreeSet;
use std::path::Path;

use walkdir::WalkDir;

use crate::{Error, NormalizedPath, Result};

/// Every file under `root`, as sorted forward-slash relative paths.
///
/// Symlinks are not followed into directories; a symlink pointing at a file
/// is listed like a file.
pub fn list_files(root: &Path) -> Result<BTreeSet<NormalizedPath>> {
    walk(root, |entry| entry.path().is_file())
}

/// Every directory under `root` (excluding `root` itself).
pub fn list_dirs(root: &Path) -> Result<BTreeSet<NormalizedPath>> {
    walk(root, |entry| entry.file_type().is_dir())
}

fn walk(
    root: &Path,
    keep: impl Fn(&walkdir::DirEntry) -> bool,
) -> Result<BTreeSet<NormalizedPath>> {
    let mut out = BTreeSet::new();
    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::io(path, e.into())
        })?;
        if !keep(&entry) {
            continue;
        }
        // strip_prefix cannot fail for entries yielded under root
        if let Ok(rel) = entry.path().strip_prefix(root) {
            out.insert(NormalizedPath::new(rel));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_nested_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b/c")).unwrap();
        std::fs::write(dir.path().join("b/c/z.md"), "").unwrap();
        std::fs::write(dir.path().join("a.md"), "").unwrap();

        let files: Vec<_> = list_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.as_str().to_string())
            .collect();
        assert_eq!(files, vec!["a.md", "b/c/z.md"]);

        let dirs: Vec<_> = list_dirs(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.as_str().to_string())
            .collect();
        assert_eq!(dirs, vec!["b", "b/c"]);
    }
}
