//! Process-table lookup for daemon discovery.
//!
//! A launcher restart must find the daemon it (or a previous launcher)
//! already started instead of spawning a second one. The primary mechanism
//! is the daemon record file; the process-table scan here is the fallback
//! that also catches daemons started by hand.

use sysinfo::{Pid, System};

/// Looks up running processes. Abstracted so supervision logic can be
/// exercised against in-memory fakes.
pub trait ProcessRegistry {
    /// Find a running process whose command name matches `name` exactly.
    ///
    /// Returns its PID, or `None` when nothing matches. When several
    /// processes match, the lowest PID is returned so repeated lookups are
    /// deterministic.
    fn find_process_by_name(&mut self, name: &str) -> Option<u32>;

    /// Command name of the process with `pid`, if it exists.
    ///
    /// Used to reject stale daemon records whose PID the OS has recycled
    /// for an unrelated process.
    fn process_name(&mut self, pid: u32) -> Option<String>;
}

/// [`ProcessRegistry`] backed by the OS process table.
pub struct SystemProcessRegistry {
    system: System,
}

impl SystemProcessRegistry {
    /// Create a registry; each lookup refreshes its process snapshot.
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRegistry for SystemProcessRegistry {
    fn find_process_by_name(&mut self, name: &str) -> Option<u32> {
        self.system.refresh_processes();
        self.system
            .processes()
            .iter()
            .filter(|(_, process)| process.name() == name)
            .map(|(pid, _)| pid.as_u32())
            .min()
    }

    fn process_name(&mut self, pid: u32) -> Option<String> {
        self.system.refresh_process(Pid::from_u32(pid));
        self.system
            .process(Pid::from_u32(pid))
            .map(|process| process.name().to_string())
    }
}
