//! SHA-256 content fingerprints
//!
//! Provides a single canonical fingerprint format (`sha256:<hex>`) used for
//! drift detection. Directory fingerprints cover the relative path and bytes
//! of every file in the tree, in sorted order.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::tree::list_files;
use crate::{Error, Result};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of in-memory content.
///
/// Returns a string in the canonical format `"sha256:<hex>"`.
pub fn compute_content_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the SHA-256 checksum of a file's contents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(compute_content_checksum(&content))
}

/// Compute the checksum of a directory tree.
///
/// Each file contributes its forward-slash relative path and its bytes, each
/// followed by a NUL separator. Empty directories do not contribute.
pub fn compute_tree_checksum(root: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    for rel in list_files(root)? {
        let full = root.join(rel.to_native());
        let content = std::fs::read(&full).map_err(|e| Error::io(&full, e))?;
        hasher.update(rel.as_str().as_bytes());
        hasher.update([0]);
        hasher.update(&content);
        hasher.update([0]);
    }
    Ok(format!("{}{:x}", PREFIX, hasher.finalize()))
}

/// Fingerprint whatever lives at `path`: a file, a directory tree, or nothing.
pub fn fingerprint(path: &Path) -> Result<Option<String>> {
    if path.is_dir() {
        compute_tree_checksum(path).map(Some)
    } else if path.exists() {
        compute_file_checksum(path).map(Some)
    } else {
        Ok(None)
    }
}
