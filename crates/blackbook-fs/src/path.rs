//! Path specifications and normalized relative paths
//!
//! Configuration refers to locations as *path specs*: `~/...` home-relative
//! paths, absolute paths, URLs, or paths relative to the source repository.
//! [`resolve`] turns a spec into a concrete path. Resolution is purely lexical
//! and never touches the filesystem.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Environment variable overriding the home directory used for `~` expansion.
pub const HOME_OVERRIDE_VAR: &str = "BLACKBOOK_HOME";

static URL_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("URL scheme pattern is valid")
});

/// The home directory used for `~` expansion.
///
/// `BLACKBOOK_HOME` takes precedence over the platform home directory.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os(HOME_OVERRIDE_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
}

/// Whether `spec` carries a URL scheme (`https://`, `git+ssh://`, ...).
pub fn is_url(spec: &str) -> bool {
    URL_SCHEME.is_match(spec)
}

/// Whether `spec` contains glob metacharacters.
pub fn is_glob(spec: &str) -> bool {
    !is_url(spec) && spec.contains(['*', '?', '['])
}

/// Expand a leading `~` to the current user's home directory.
///
/// `~user` forms are returned unchanged, as is everything when no home
/// directory can be determined.
pub fn expand_home(spec: &str) -> PathBuf {
    expand_home_with(spec, home_dir().as_deref())
}

fn expand_home_with(spec: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(spec);
    };
    if spec == "~" {
        return home.to_path_buf();
    }
    match spec
        .strip_prefix("~/")
        .or_else(|| spec.strip_prefix("~\\"))
    {
        Some(rest) => home.join(rest),
        None => PathBuf::from(spec),
    }
}

/// Resolve a path spec into a concrete path.
///
/// - URLs are returned unchanged; fetching them is someone else's job.
/// - `~` is expanded under the home directory.
/// - Absolute paths are returned unchanged.
/// - Anything else is joined onto `base` (itself resolved by these rules),
///   or returned as-is when there is no base.
pub fn resolve(spec: &str, base: Option<&str>) -> PathBuf {
    resolve_with_home(spec, base, home_dir().as_deref())
}

/// [`resolve`] with an explicit home directory.
pub fn resolve_with_home(spec: &str, base: Option<&str>, home: Option<&Path>) -> PathBuf {
    if is_url(spec) {
        return PathBuf::from(spec);
    }
    if spec.starts_with('~') {
        return expand_home_with(spec, home);
    }
    let path = Path::new(spec);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match base {
        Some(base) if !base.is_empty() => {
            let base = resolve_with_home(base, None, home);
            tracing::trace!(spec, base = %base.display(), "Resolving relative to base");
            base.join(path)
        }
        _ => path.to_path_buf(),
    }
}

/// A relative path normalized to use forward slashes internally.
///
/// Used for entries inside a synced directory tree so that fingerprints and
/// diff listings are identical across platforms.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    ///
    /// Converts backslashes to forward slashes for internal storage.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        let normalized = path_str.replace('\\', "/");
        Self { inner: normalized }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a segment.
    pub fn join(&self, segment: &str) -> Self {
        let segment_normalized = segment.replace('\\', "/");
        if self.inner.is_empty() {
            return Self {
                inner: segment_normalized,
            };
        }
        let joined = if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment_normalized)
        } else {
            format!("{}/{}", self.inner, segment_normalized)
        };
        Self { inner: joined }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 {
                None
            } else {
                Some(&name[idx + 1..])
            }
        })
    }
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}
