//! [`TestEnv`] sandbox for blackbook test scenarios.
//!
//! Every path a blackbook run touches lives under one temporary directory:
//!
//! ```text
//! <root>/source   source repo
//! <root>/config   config layers
//! <root>/cache    manifest
//! <root>/home     instance config dirs
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary sandbox with helper methods for test setup and assertion.
///
/// # Example
///
/// ```rust,no_run
/// use blackbook_test_utils::TestEnv;
///
/// let env = TestEnv::new();
/// env.write_source("CLAUDE.md", "v1");
/// env.write_config(
///     "tools:\n  claude:\n    instances:\n      - id: default\n        config_dir: {home}/.claude\n\
///      files:\n  - name: CLAUDE.md\n    source: CLAUDE.md\n    target: CLAUDE.md\n",
/// );
/// env.assert_file_exists(&env.home().join(".claude/CLAUDE.md"));
/// ```
pub struct TestEnv {
    temp_dir: TempDir,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    /// Create the sandbox with all four directories present.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        for dir in ["source", "config", "cache", "home"] {
            fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn source(&self) -> PathBuf {
        self.root().join("source")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root().join("config")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root().join("cache")
    }

    pub fn home(&self) -> PathBuf {
        self.root().join("home")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.cache_dir().join("manifest.json")
    }

    /// Write `config.yaml` after substituting `{source}`, `{cache}` and
    /// `{home}`. A `settings` block pointing at the sandbox is prepended
    /// unless the body declares its own.
    pub fn write_config(&self, body: &str) -> PathBuf {
        let mut content = self.expand(body);
        if !content.contains("settings:") {
            content = format!(
                "settings:\n  source_repo: {}\n  cache_dir: {}\n{content}",
                self.source().display(),
                self.cache_dir().display()
            );
        }
        let path = self.config_dir().join("config.yaml");
        fs::write(&path, content).unwrap();
        path
    }

    /// Write `config.local.yaml`, with the same substitutions as
    /// [`TestEnv::write_config`] but no settings block.
    pub fn write_local_config(&self, body: &str) -> PathBuf {
        let path = self.config_dir().join("config.local.yaml");
        fs::write(&path, self.expand(body)).unwrap();
        path
    }

    fn expand(&self, body: &str) -> String {
        body.replace("{source}", &self.source().display().to_string())
            .replace("{cache}", &self.cache_dir().display().to_string())
            .replace("{home}", &self.home().display().to_string())
    }

    /// Write a file under the source repo, creating parents.
    pub fn write_source(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.source().join(rel), content)
    }

    /// Write a file under the fake home, creating parents.
    pub fn write_home(&self, rel: &str, content: &str) -> PathBuf {
        write_file(&self.home().join(rel), content)
    }

    /// Read a file as text.
    ///
    /// # Panics
    /// Panics with the path if the file cannot be read.
    pub fn read(&self, path: &Path) -> String {
        fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
    }

    /// Assert that `path` exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &Path) {
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }

    /// Assert that `path` does **not** exist.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, path: &Path) {
        assert!(
            !path.exists(),
            "Expected file NOT to exist: {}",
            path.display()
        );
    }

    /// Assert that the file at `path` holds exactly `expected`.
    ///
    /// # Panics
    /// Panics showing both contents on mismatch.
    pub fn assert_content(&self, path: &Path, expected: &str) {
        let actual = self.read(path);
        assert!(
            actual == expected,
            "File {} does not hold expected content.\nExpected: {}\nActual: {}",
            path.display(),
            expected,
            actual
        );
    }
}

fn write_file(path: &Path, content: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    path.to_path_buf()
}
