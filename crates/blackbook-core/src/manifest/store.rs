//! Locked, atomic persistence for the manifest

use std::path::{Path, PathBuf};

use blackbook_fs::io;
use blackbook_fs::lock::{LockPolicy, with_lock_policy};

use super::{MANIFEST_VERSION, Manifest};
use crate::{Error, Result};

/// File name of the manifest inside the cache directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Loads and saves the manifest under its cross-process lock.
///
/// Every read and write holds the lock keyed on the manifest path, so a
/// reader never interleaves with a writer in another process. Use
/// [`ManifestStore::update`] for read-modify-write cycles.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
    lock_policy: LockPolicy,
}

impl ManifestStore {
    /// Store for `<cache_dir>/manifest.json`.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(MANIFEST_FILE),
            lock_policy: LockPolicy::default(),
        }
    }

    pub fn with_lock_policy(mut self, lock_policy: LockPolicy) -> Self {
        self.lock_policy = lock_policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the manifest; a missing file is an empty manifest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestCorrupted`] if the file exists but cannot be
    /// parsed, and [`blackbook_fs::Error::LockTimeout`] if the lock stays held.
    pub fn load(&self) -> Result<Manifest> {
        with_lock_policy(&self.path, &self.lock_policy, || self.read_unlocked())
    }

    /// Save the manifest atomically.
    pub fn save(&self, manifest: &Manifest) -> Result<()> {
        with_lock_policy(&self.path, &self.lock_policy, || {
            self.write_unlocked(manifest)
        })
    }

    /// Load, mutate and save inside a single lock hold.
    ///
    /// Nothing is written if `f` fails or leaves the manifest unchanged.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Manifest) -> Result<T>,
    {
        with_lock_policy(&self.path, &self.lock_policy, || {
            let mut manifest = self.read_unlocked()?;
            let before = manifest.clone();
            let out = f(&mut manifest)?;
            if manifest != before {
                self.write_unlocked(&manifest)?;
            }
            Ok(out)
        })
    }

    /// Stable JSON rendering: sorted keys, two-space indent, trailing newline.
    pub fn render(manifest: &Manifest) -> Result<String> {
        // Value objects serialize with sorted keys
        let value = serde_json::to_value(manifest)?;
        Ok(serde_json::to_string_pretty(&value)? + "\n")
    }

    fn read_unlocked(&self) -> Result<Manifest> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No manifest yet; starting empty");
            return Ok(Manifest::default());
        }
        let content = io::read_text(&self.path)?;
        let manifest: Manifest =
            serde_json::from_str(&content).map_err(|e| Error::ManifestCorrupted {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        if manifest.version > MANIFEST_VERSION {
            return Err(Error::ManifestCorrupted {
                path: self.path.clone(),
                message: format!(
                    "unsupported manifest version {} (expected at most {MANIFEST_VERSION})",
                    manifest.version
                ),
            });
        }
        Ok(manifest)
    }

    fn write_unlocked(&self, manifest: &Manifest) -> Result<()> {
        let content = Self::render(manifest)?;
        io::write_text(&self.path, &content)?;
        tracing::debug!(path = %self.path.display(), "Saved manifest");
        Ok(())
    }
}
