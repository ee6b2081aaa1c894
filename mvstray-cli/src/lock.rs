//! Launcher singleton lock.
//!
//! Exactly one launcher instance owns the daemon at a time. Ownership is a
//! JSON PID record in the data directory; a lock naming a live process means
//! another instance runs, and that instance keeps the daemon. Locks left by
//! crashed launchers (dead or recycled PIDs, unreadable content) are replaced
//! silently.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use mvstray_core::process::is_process_alive;

const LOCK_FILE: &str = "launcher.lock";

/// Contents of the lock file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockRecord {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

impl LockRecord {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            started_at: Utc::now(),
        }
    }
}

/// Path of the lock file inside `dir`.
pub fn lock_path(dir: &Path) -> PathBuf {
    dir.join(LOCK_FILE)
}

/// Result of trying to become the single launcher instance.
pub enum LockOutcome {
    /// We hold the lock now; dropping the guard releases it.
    Acquired(LockGuard),
    /// A live launcher already holds the lock.
    AlreadyRunning { pid: u32 },
}

/// Removes the lock file on drop.
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!(error = %e, path = %self.path.display(), "failed to remove launcher lock");
        }
    }
}

/// Try to become the single launcher instance for `dir`.
///
/// A parseable lock naming a live foreign PID wins. Anything else, including
/// a lock naming our own PID (our PID recycled from a crashed run), is
/// overwritten with a fresh record.
pub fn acquire(dir: &Path) -> io::Result<LockOutcome> {
    let path = lock_path(dir);
    if let Some(record) = read_lock(&path) {
        if record.pid != std::process::id() && is_process_alive(record.pid) {
            return Ok(LockOutcome::AlreadyRunning { pid: record.pid });
        }
        debug!(pid = record.pid, "replacing stale launcher lock");
    }
    fs::create_dir_all(dir)?;
    let record = LockRecord::current();
    fs::write(&path, serde_json::to_string_pretty(&record)?)?;
    Ok(LockOutcome::Acquired(LockGuard { path }))
}

fn read_lock(path: &Path) -> Option<LockRecord> {
    let contents = fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}
