//! Handle to the supervised daemon process.

use std::path::{Path, PathBuf};
use std::process::Child;

use tracing::{debug, warn};

use crate::process;

/// How we hold the daemon process.
///
/// The distinction matters for liveness: an exited child we spawned stays
/// in the process table until reaped, so it still answers signal 0; only
/// its wait status tells the truth. A foreign PID has no wait status to
/// consult, so signal 0 is all we have.
#[derive(Debug)]
pub enum DaemonProcess {
    /// Spawned by this launcher; we own the wait status.
    Spawned(Child),
    /// Found already running; we only know the PID.
    Adopted(u32),
}

/// The one supervised daemon instance.
///
/// Created on spawn or adoption, dropped once the daemon is confirmed
/// gone. Dropping the handle does NOT kill the daemon: it is meant to
/// outlive the launcher except on explicit quit.
#[derive(Debug)]
pub struct DaemonHandle {
    executable: PathBuf,
    process: DaemonProcess,
}

impl DaemonHandle {
    /// Wrap a child spawned from `executable`.
    pub fn spawned(executable: PathBuf, child: Child) -> Self {
        Self {
            executable,
            process: DaemonProcess::Spawned(child),
        }
    }

    /// Adopt an already-running daemon.
    pub fn adopted(executable: PathBuf, pid: u32) -> Self {
        Self {
            executable,
            process: DaemonProcess::Adopted(pid),
        }
    }

    /// PID of the daemon process.
    pub fn pid(&self) -> u32 {
        match &self.process {
            DaemonProcess::Spawned(child) => child.id(),
            DaemonProcess::Adopted(pid) => *pid,
        }
    }

    /// Path the daemon was spawned from (or the name it was adopted under).
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Whether the daemon process still exists.
    pub fn is_alive(&mut self) -> bool {
        match &mut self.process {
            DaemonProcess::Spawned(child) => match child.try_wait() {
                Ok(None) => true,
                Ok(Some(status)) => {
                    debug!(pid = child.id(), %status, "daemon child has exited");
                    false
                }
                Err(e) => {
                    warn!(pid = child.id(), error = %e, "could not read daemon wait status");
                    false
                }
            },
            DaemonProcess::Adopted(pid) => process::is_process_alive(*pid),
        }
    }

    /// Send a forceful kill and, for an owned child, reap it.
    ///
    /// Returns whether the signal was delivered; an already-dead daemon is
    /// a normal `false`, never an error.
    pub fn kill(&mut self) -> bool {
        match &mut self.process {
            DaemonProcess::Spawned(child) => match child.kill() {
                Ok(()) => {
                    let _ = child.wait();
                    true
                }
                Err(e) => {
                    // std reports a kill on an already-exited child as
                    // InvalidInput; anything else is worth a warning.
                    if e.kind() == std::io::ErrorKind::InvalidInput {
                        debug!(pid = child.id(), "daemon child already exited");
                    } else {
                        warn!(pid = child.id(), error = %e, "failed to kill daemon child");
                    }
                    let _ = child.try_wait();
                    false
                }
            },
            DaemonProcess::Adopted(pid) => process::kill_process(*pid),
        }
    }
}
