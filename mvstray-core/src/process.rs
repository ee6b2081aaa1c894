//! Process-level liveness and termination primitives.
//!
//! Liveness of a foreign PID is checked with signal 0; termination is an
//! unconditional SIGKILL with "no such process" swallowed. Both operate on
//! raw PIDs; supervision of a child we spawned ourselves goes through
//! [`DaemonHandle`](crate::handle::DaemonHandle), which can reap.

#[cfg(unix)]
use tracing::{debug, warn};

/// Check if a process is still alive.
///
/// Uses kill(pid, 0) on Unix to check if the process exists.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    // SAFETY: kill with signal 0 only checks if process exists, doesn't send a signal
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

/// Check if a process is still alive (non-Unix: process-table lookup).
#[cfg(not(unix))]
pub fn is_process_alive(pid: u32) -> bool {
    use sysinfo::{Pid, System};
    let mut system = System::new();
    system.refresh_process(Pid::from_u32(pid))
}

/// Send a forceful kill to `pid`.
///
/// Returns whether the signal was delivered. A PID that is already gone is
/// a normal `false` result, never an error; termination must never block
/// launcher exit.
#[cfg(unix)]
pub fn kill_process(pid: u32) -> bool {
    // SAFETY: SIGKILL to an explicit, non-negative PID
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGKILL) };
    if rc == 0 {
        return true;
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        debug!(pid, "kill: process already gone");
    } else {
        warn!(pid, error = %err, "kill signal delivery failed");
    }
    false
}

/// Send a forceful kill to `pid` (non-Unix: TerminateProcess equivalent).
#[cfg(not(unix))]
pub fn kill_process(pid: u32) -> bool {
    use sysinfo::{Pid, System};
    let mut system = System::new();
    if !system.refresh_process(Pid::from_u32(pid)) {
        return false;
    }
    match system.process(Pid::from_u32(pid)) {
        Some(process) => process.kill(),
        None => false,
    }
}
