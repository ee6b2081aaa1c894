//! Daemon record file management
//!
//! Tracks the supervised daemon with PID, port, executable and start time.
//! The record is persisted under the launcher's data directory so a
//! restarted launcher can adopt its previous daemon instead of spawning a
//! second one.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File name of the daemon record inside the state directory.
const RECORD_FILE: &str = "daemon.json";

/// Record of a supervised daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonRecord {
    /// Process ID of the daemon
    pub pid: u32,
    /// RPC port the daemon serves on
    pub port: u16,
    /// Executable the daemon was started from
    pub executable: PathBuf,
    /// When the daemon came under supervision
    pub started_at: DateTime<Utc>,
}

impl DaemonRecord {
    /// Create a record for a daemon that just came under supervision
    pub fn new(pid: u32, port: u16, executable: PathBuf) -> Self {
        Self {
            pid,
            port,
            executable,
            started_at: Utc::now(),
        }
    }

    /// File name of the recorded executable
    ///
    /// This is what the recorded PID must still show in the process table
    /// for the record to be trusted (a recycled PID will not)
    pub fn executable_name(&self) -> Option<&str> {
        self.executable.file_name().and_then(OsStr::to_str)
    }
}

/// Get the path of the daemon record inside `dir`
pub fn record_path(dir: &Path) -> PathBuf {
    dir.join(RECORD_FILE)
}

/// Read the daemon record from `dir`
///
/// Returns None if the file doesn't exist or is invalid JSON
pub fn read_record(dir: &Path) -> Option<DaemonRecord> {
    let content = fs::read_to_string(record_path(dir)).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write the daemon record into `dir`
///
/// Creates the directory if it doesn't exist
pub fn write_record(dir: &Path, record: &DaemonRecord) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let content = serde_json::to_string_pretty(record)?;
    fs::write(record_path(dir), content)
}

/// Remove the daemon record from `dir`, if present
pub fn clear_record(dir: &Path) -> io::Result<()> {
    let path = record_path(dir);
    if path.exists() {
        fs::remove_file(&path)?;
    }
    Ok(())
}
