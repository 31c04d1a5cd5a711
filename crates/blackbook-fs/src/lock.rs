//! Cross-process advisory locking with marker files
//!
//! A lock on `path` is held by whoever managed to create the sibling marker
//! `<path>.lock` with create-new semantics. Acquisition is retried a bounded
//! number of times with linearly increasing delays. The marker's content
//! (holder pid and acquisition time) is informational only.
//!
//! Markers older than the stale threshold are treated as abandoned. Reclaiming
//! one is a test-and-set: the marker is first renamed to a name unique to this
//! reclaimer, so of several processes seeing the same stale marker only one
//! wins the rename. The winner re-checks the age of what it actually claimed
//! and puts a fresh marker back instead of deleting it.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use backoff::backoff::Backoff;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const LOCK_SUFFIX: &str = ".lock";
const STALE_INFIX: &str = ".stale.";

static RECLAIM_SEQ: AtomicU64 = AtomicU64::new(0);

/// Retry and staleness policy for lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPolicy {
    /// Total acquisition attempts before giving up.
    pub attempts: u32,
    /// Delay unit; the wait after attempt `n` is `backoff_step * n`.
    pub backoff_step: Duration,
    /// Age after which an existing marker is considered abandoned.
    pub stale_after: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff_step: Duration::from_millis(50),
            stale_after: Duration::from_secs(30),
        }
    }
}

/// Linearly increasing delay schedule: `step`, `2 * step`, `3 * step`, ...
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    step: Duration,
    issued: u32,
    max_delays: u32,
}

impl LinearBackoff {
    pub fn new(step: Duration, max_delays: u32) -> Self {
        Self {
            step,
            issued: 0,
            max_delays,
        }
    }
}

impl Backoff for LinearBackoff {
    fn reset(&mut self) {
        self.issued = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.issued >= self.max_delays {
            return None;
        }
        self.issued += 1;
        Some(self.step * self.issued)
    }
}

/// Diagnostic content written into a lock marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub acquired_at_unix: u64,
}

/// Marker path guarding `path`.
pub fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(LOCK_SUFFIX);
    path.with_file_name(name)
}

/// Read the holder information from an existing marker, if any.
pub fn read_holder(path: &Path) -> Option<LockHolder> {
    let content = fs::read_to_string(lock_path_for(path)).ok()?;
    serde_json::from_str(&content).ok()
}

/// A held lock. The marker is removed when the guard is dropped.
#[derive(Debug)]
pub struct LockGuard {
    marker: PathBuf,
}

impl LockGuard {
    /// Acquire the lock for `path` with the default policy.
    pub fn acquire(path: &Path) -> Result<Self> {
        Self::acquire_with(path, &LockPolicy::default())
    }

    /// Acquire the lock for `path`, retrying according to `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockTimeout`] once every attempt found the marker held
    /// by someone else, or an I/O error if the marker cannot be created.
    pub fn acquire_with(path: &Path, policy: &LockPolicy) -> Result<Self> {
        let marker = lock_path_for(path);
        if let Some(parent) = marker.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let mut schedule = LinearBackoff::new(policy.backoff_step, policy.attempts.saturating_sub(1));
        let mut attempts = 0;

        loop {
            attempts += 1;
            if try_create_marker(&marker)? {
                tracing::debug!(path = %path.display(), attempts, "Acquired lock");
                return Ok(Self { marker });
            }
            if attempts >= policy.attempts {
                break;
            }

            match marker_age(&marker) {
                // Holder released between our attempt and the stat
                None => continue,
                Some(age) if age > policy.stale_after => {
                    tracing::warn!(
                        marker = %marker.display(),
                        age_secs = age.as_secs(),
                        holder = ?read_holder(path),
                        "Reclaiming stale lock marker"
                    );
                    reclaim_stale(&marker, policy.stale_after)?;
                    continue;
                }
                Some(_) => {}
            }

            match schedule.next_backoff() {
                Some(delay) => {
                    tracing::debug!(path = %path.display(), attempts, ?delay, "Lock busy, backing off");
                    std::thread::sleep(delay);
                }
                None => break,
            }
        }

        tracing::debug!(path = %path.display(), holder = ?read_holder(path), "Lock acquisition timed out");
        Err(Error::LockTimeout {
            path: path.to_path_buf(),
            attempts,
        })
    }

    /// Path of the marker file backing this lock.
    pub fn marker(&self) -> &Path {
        &self.marker
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.marker) {
            Ok(()) => tracing::trace!(marker = %self.marker.display(), "Released lock"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(marker = %self.marker.display(), error = %e, "Failed to remove lock marker")
            }
        }
    }
}

/// Returns `Ok(false)` when the marker already exists.
fn try_create_marker(marker: &Path) -> Result<bool> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(marker) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(Error::io(marker, e)),
    };

    let holder = LockHolder {
        pid: std::process::id(),
        acquired_at_unix: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
    };
    // Holder info is diagnostic only; a failed write still means we own the lock.
    if let Ok(json) = serde_json::to_string(&holder) {
        let _ = file.write_all(json.as_bytes());
    }
    Ok(true)
}

/// Unique name a reclaimer moves a stale marker to.
fn claimed_path_for(marker: &Path) -> PathBuf {
    let mut name = marker
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(
        "{STALE_INFIX}{}.{}",
        std::process::id(),
        RECLAIM_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    marker.with_file_name(name)
}

/// Remove a stale marker so the next create attempt can succeed.
///
/// Losing the rename race (NotFound) is not an error: someone else is
/// reclaiming or the holder released.
fn reclaim_stale(marker: &Path, stale_after: Duration) -> Result<()> {
    let claimed = claimed_path_for(marker);
    match fs::rename(marker, &claimed) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(marker = %marker.display(), "Stale marker already reclaimed");
            return Ok(());
        }
        Err(e) => return Err(Error::io(marker, e)),
    }

    // Rename keeps the mtime, so this is the age of what we actually took
    let still_stale = marker_age(&claimed).is_none_or(|age| age > stale_after);
    if !still_stale {
        // A new holder created the marker after our stat; hand it back
        match fs::hard_link(&claimed, marker) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::warn!(
                    marker = %marker.display(),
                    "Fresh lock marker was replaced while being restored"
                );
            }
            Err(e) => return Err(Error::io(marker, e)),
        }
    }

    match fs::remove_file(&claimed) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(&claimed, e)),
    }
}

fn marker_age(marker: &Path) -> Option<Duration> {
    let modified = fs::metadata(marker).ok()?.modified().ok()?;
    Some(SystemTime::now().duration_since(modified).unwrap_or_default())
}

/// Run `f` while holding the lock for `path`, using the default policy.
///
/// The lock is released on every exit path, including errors and panics.
pub fn with_lock<T, E, F>(path: &Path, f: F) -> std::result::Result<T, E>
where
    F: FnOnce() -> std::result::Result<T, E>,
    E: From<Error>,
{
    with_lock_policy(path, &LockPolicy::default(), f)
}

/// [`with_lock`] with an explicit retry policy.
pub fn with_lock_policy<T, E, F>(path: &Path, policy: &LockPolicy, f: F) -> std::result::Result<T, E>
where
    F: FnOnce() -> std::result::Result<T, E>,
    E: From<Error>,
{
    let _guard = LockGuard::acquire_with(path, policy)?;
    f()
}
