//! Atomic I/O operations
//!
//! Every persisted mutation goes through [`write_atomic`]: content is written
//! to a temporary file next to the destination, flushed to durable storage,
//! and renamed over the destination. Readers observe either the old file or
//! the new one, never a partial write.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// A fully written and synced temporary file waiting to replace its target.
///
/// Dropping a `StagedWrite` without calling [`StagedWrite::commit`] removes
/// the temporary file and leaves the destination untouched.
#[derive(Debug)]
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    /// Path of the temporary file holding the staged content.
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Destination the staged content will replace.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically rename the staged file onto its destination.
    pub fn commit(self) -> Result<()> {
        let target = self.target;
        self.temp
            .persist(&target)
            .map_err(|e| Error::write_failure(&target, e.error))?;

        // Persist the rename itself; not every platform allows syncing a directory.
        #[cfg(unix)]
        if let Some(parent) = target.parent()
            && let Ok(dir) = File::open(parent)
        {
            let _ = dir.sync_all();
        }

        tracing::trace!(path = %target.display(), "Committed atomic write");
        Ok(())
    }
}

/// Write `content` to a temporary file in the destination's directory and sync it.
///
/// Parent directories are created as needed. Fails with
/// [`Error::WriteFailure`] when the filesystem reports too little free space
/// for the content, before anything is written.
pub fn stage(path: &Path, content: &[u8]) -> Result<StagedWrite> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| Error::write_failure(path, e))?;

    if let Ok(available) = fs2::available_space(&parent)
        && available < content.len() as u64
    {
        return Err(Error::write_failure(
            path,
            std::io::Error::other(format!(
                "insufficient free space: {} bytes needed, {} available",
                content.len(),
                available
            )),
        ));
    }

    // Temp file pattern is .{filename}.XXXXXX.tmp in the same directory
    let prefix = format!(
        ".{}.",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default()
    );
    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(&parent)
        .map_err(|e| Error::write_failure(path, e))?;

    temp.write_all(content)
        .map_err(|e| Error::write_failure(path, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| Error::write_failure(path, e))?;

    apply_permissions(&temp, path).map_err(|e| Error::write_failure(path, e))?;

    Ok(StagedWrite {
        temp,
        target: path.to_path_buf(),
    })
}

/// Keep the destination's permissions when replacing it; new files get the
/// usual `rw-r--r--` instead of the temp file's owner-only mode.
fn apply_permissions(temp: &NamedTempFile, target: &Path) -> std::io::Result<()> {
    match fs::metadata(target) {
        Ok(meta) => fs::set_permissions(temp.path(), meta.permissions()),
        Err(_) => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o644))
            }
            #[cfg(not(unix))]
            {
                Ok(())
            }
        }
    }
}

/// Write content atomically to a file.
///
/// Uses write-to-temp-then-rename strategy to prevent partial writes.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    stage(path, content)?.commit()
}

/// Write text content to a file atomically.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Read text content from a file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Read raw bytes from a file.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::io(path, e))
}

/// Remove a file or a whole directory tree. Returns whether anything existed.
pub fn remove(path: &Path) -> Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(Error::io(path, e)),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path).map_err(|e| Error::io(path, e))?;
    } else {
        fs::remove_file(path).map_err(|e| Error::io(path, e))?;
    }
    tracing::debug!(path = %path.display(), "Removed");
    Ok(true)
}
