//! Daemon lifecycle supervision.
//!
//! The supervisor walks one daemon through
//! `Idle → Launching → AwaitingReady → Running → Terminating → Stopped`.
//! Launching prefers adoption over spawning: a daemon recorded by a
//! previous launcher run, or one found in the process table, is taken over
//! as-is and assumed healthy. Only a freshly spawned daemon goes through
//! the bounded readiness wait on its RPC port.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::handle::DaemonHandle;
use crate::probe::{self, ReadinessState};
use crate::process;
use crate::registry::ProcessRegistry;
use crate::statefile::{self, DaemonRecord};

/// Default RPC/web port of the supervised node.
pub const DEFAULT_RPC_PORT: u16 = 8820;

/// Default executable name of the supervised node.
pub const DEFAULT_DAEMON_NAME: &str = "mvsd";

/// Total budget for the readiness wait after a spawn.
pub const READY_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause between readiness probes.
pub const READY_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Pause between liveness checks while Running.
pub const LIVENESS_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle state of the supervised daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// No daemon attached yet.
    Idle,
    /// Looking for a daemon to adopt, or spawning one.
    Launching,
    /// Spawned; waiting for the RPC port to open.
    AwaitingReady,
    /// Daemon is up (ready, or adopted and assumed so).
    Running,
    /// Forceful teardown in progress.
    Terminating,
    /// No live daemon; terminal until the next launch.
    Stopped,
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SupervisorState::Idle => "idle",
            SupervisorState::Launching => "launching",
            SupervisorState::AwaitingReady => "awaiting-ready",
            SupervisorState::Running => "running",
            SupervisorState::Terminating => "terminating",
            SupervisorState::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

/// How the daemon came under supervision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// An existing daemon was adopted; no readiness wait is needed.
    Adopted {
        /// PID of the adopted process.
        pid: u32,
    },
    /// A fresh daemon was spawned; readiness must be awaited.
    Spawned {
        /// PID of the spawned child.
        pid: u32,
    },
}

/// Resolution of the bounded readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// The RPC port opened within budget.
    Ready,
    /// The port never opened before the timeout.
    TimedOut,
    /// The wait was cancelled (user quit).
    Cancelled,
    /// The daemon exited before its port opened.
    Exited,
}

/// Where the daemon lives and how patiently we wait for it.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Explicit path to the daemon binary; skips resolution when set.
    pub binary: Option<PathBuf>,
    /// Executable name, used for sibling/`$PATH` resolution and for
    /// process-table scans.
    pub name: String,
    /// RPC/web port probed for readiness and served to the browser.
    pub port: u16,
    /// Arguments forwarded verbatim to a spawned daemon.
    pub args: Vec<String>,
    /// Directory holding the launcher's daemon record.
    pub state_dir: PathBuf,
    /// Total budget for the readiness wait.
    pub ready_timeout: Duration,
    /// Pause between readiness probes.
    pub ready_check_interval: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            binary: None,
            name: DEFAULT_DAEMON_NAME.to_string(),
            port: DEFAULT_RPC_PORT,
            args: Vec::new(),
            state_dir: mvstray_paths::data_dir(),
            ready_timeout: READY_TIMEOUT,
            ready_check_interval: READY_CHECK_INTERVAL,
        }
    }
}

impl DaemonConfig {
    /// Set an explicit daemon binary path.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    /// Set the daemon executable name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the RPC/web port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the arguments forwarded to a spawned daemon.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Set the directory holding the daemon record.
    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    /// Set the total readiness budget.
    #[must_use]
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Set the pause between readiness probes.
    #[must_use]
    pub fn with_ready_check_interval(mut self, interval: Duration) -> Self {
        self.ready_check_interval = interval;
        self
    }

    /// Resolve the daemon executable: explicit path, then a sibling of the
    /// launcher executable, then `$PATH`.
    pub fn resolve_binary(&self) -> Result<PathBuf> {
        let exe_dir = std::env::current_exe().ok();
        self.resolve_binary_in(exe_dir.as_deref().and_then(Path::parent))
    }

    fn resolve_binary_in(&self, launcher_dir: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = &self.binary {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(Error::BinaryNotFound(path.display().to_string()));
        }
        if let Some(dir) = launcher_dir {
            let sibling = dir.join(&self.name);
            if sibling.exists() {
                return Ok(sibling);
            }
        }
        which::which(&self.name).map_err(|_| Error::BinaryNotFound(self.name.clone()))
    }
}

/// Owns the daemon lifecycle: launch or adopt, readiness, liveness,
/// teardown.
///
/// The caller is responsible for ensuring only one launcher supervises at
/// a time (see the launcher's singleton lock); the supervisor itself
/// guarantees at most one daemon handle.
pub struct DaemonSupervisor {
    config: DaemonConfig,
    registry: Box<dyn ProcessRegistry + Send>,
    handle: Option<DaemonHandle>,
    state: SupervisorState,
}

impl DaemonSupervisor {
    /// Create a supervisor in `Idle` with no daemon attached.
    pub fn new(config: DaemonConfig, registry: Box<dyn ProcessRegistry + Send>) -> Self {
        Self {
            config,
            registry,
            handle: None,
            state: SupervisorState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// PID of the supervised daemon, if one is attached.
    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().map(DaemonHandle::pid)
    }

    /// The supervisor's configuration.
    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Attach a daemon: adopt one that is already running, otherwise spawn.
    ///
    /// Adoption checks the daemon record from a previous launcher run
    /// first, then falls back to a process-table scan by name. An adopted
    /// daemon is assumed healthy and goes straight to `Running`; a spawned
    /// one lands in `AwaitingReady` and must be driven through
    /// [`wait_ready`](Self::wait_ready).
    pub fn launch(&mut self) -> Result<Launch> {
        self.state = SupervisorState::Launching;

        if let Some((pid, executable)) = self.find_existing() {
            let record = DaemonRecord::new(pid, self.config.port, executable.clone());
            if let Err(e) = statefile::write_record(&self.config.state_dir, &record) {
                warn!(error = %e, "failed to write daemon record");
            }
            let handle = DaemonHandle::adopted(executable, pid);
            info!(pid, executable = %handle.executable().display(), "adopted running daemon");
            self.handle = Some(handle);
            self.state = SupervisorState::Running;
            return Ok(Launch::Adopted { pid });
        }

        match self.spawn_daemon() {
            Ok(pid) => Ok(Launch::Spawned { pid }),
            Err(e) => {
                self.state = SupervisorState::Stopped;
                Err(e)
            }
        }
    }

    /// Find an adoptable daemon: recorded PID first, then a name scan.
    fn find_existing(&mut self) -> Option<(u32, PathBuf)> {
        if let Some(record) = statefile::read_record(&self.config.state_dir) {
            // The PID is validated against the record's own executable name,
            // not the configured scan name; the two differ whenever `binary`
            // points at a differently named build.
            let recorded_name = record.executable_name();
            let still_ours = recorded_name.is_some()
                && process::is_process_alive(record.pid)
                && self.registry.process_name(record.pid).as_deref() == recorded_name;
            if still_ours {
                debug!(pid = record.pid, "daemon record points at a live daemon");
                return Some((record.pid, record.executable));
            }
            debug!(pid = record.pid, "clearing stale daemon record");
            if let Err(e) = statefile::clear_record(&self.config.state_dir) {
                warn!(error = %e, "failed to clear stale daemon record");
            }
        }

        self.registry
            .find_process_by_name(&self.config.name)
            .map(|pid| (pid, PathBuf::from(&self.config.name)))
    }

    /// Spawn the daemon detached, record it, and enter `AwaitingReady`.
    fn spawn_daemon(&mut self) -> Result<u32> {
        let binary = self.config.resolve_binary()?;

        let mut command = Command::new(&binary);
        command
            .args(&self.config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Detach into its own session so the daemon outlives the launcher.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // SAFETY: setsid is async-signal-safe and we do nothing else
            // between fork and exec
            unsafe {
                command.pre_exec(|| {
                    libc::setsid();
                    Ok(())
                });
            }
        }

        let child: Child = command.spawn()?;
        let pid = child.id();

        let record = DaemonRecord::new(pid, self.config.port, binary.clone());
        if let Err(e) = statefile::write_record(&self.config.state_dir, &record) {
            warn!(error = %e, "failed to write daemon record");
        }

        info!(pid, binary = %binary.display(), args = ?self.config.args, "spawned daemon");
        self.handle = Some(DaemonHandle::spawned(binary, child));
        self.state = SupervisorState::AwaitingReady;
        Ok(pid)
    }

    /// Bounded, cancellable wait for the daemon's RPC port to open.
    ///
    /// Probes every `ready_check_interval` until `ready_timeout` runs out,
    /// watching the daemon so a crash surfaces as [`ReadyOutcome::Exited`]
    /// instead of a full-timeout stall. Never blocks the caller's event
    /// loop; cancelling `cancel` resolves the wait promptly.
    pub async fn wait_ready(&mut self, cancel: &CancellationToken) -> ReadyOutcome {
        let deadline = tokio::time::Instant::now() + self.config.ready_timeout;
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                debug!("readiness wait cancelled");
                return ReadyOutcome::Cancelled;
            }
            if !self.daemon_alive() {
                warn!("daemon exited before its RPC port opened");
                self.forget_daemon();
                return ReadyOutcome::Exited;
            }

            attempts += 1;
            if probe::check(self.config.port).await == ReadinessState::Ready {
                info!(port = self.config.port, attempts, "daemon RPC port is open");
                self.state = SupervisorState::Running;
                return ReadyOutcome::Ready;
            }

            if tokio::time::Instant::now() >= deadline {
                warn!(
                    port = self.config.port,
                    attempts,
                    timeout = ?self.config.ready_timeout,
                    "daemon did not open its RPC port in time"
                );
                return ReadyOutcome::TimedOut;
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("readiness wait cancelled");
                    return ReadyOutcome::Cancelled;
                }
                _ = tokio::time::sleep(self.config.ready_check_interval) => {}
            }
        }
    }

    /// Liveness tick while Running.
    ///
    /// Returns whether the daemon process still exists. On death the
    /// record is cleared and the supervisor moves to `Stopped`.
    pub fn check_daemon(&mut self) -> bool {
        if self.daemon_alive() {
            return true;
        }
        if let Some(handle) = &self.handle {
            warn!(
                pid = handle.pid(),
                executable = %handle.executable().display(),
                "daemon process is gone"
            );
        }
        self.forget_daemon();
        false
    }

    /// Forceful teardown: kill the recorded PID, clear the record, stop.
    ///
    /// Infallible on purpose: kill delivery failure (typically "already
    /// gone") must never keep the launcher from exiting.
    pub fn terminate(&mut self) {
        self.state = SupervisorState::Terminating;
        if let Some(mut handle) = self.handle.take() {
            let pid = handle.pid();
            info!(pid, "terminating daemon");
            if !handle.kill() {
                debug!(pid, "daemon already gone at terminate");
            }
        }
        if let Err(e) = statefile::clear_record(&self.config.state_dir) {
            warn!(error = %e, "failed to clear daemon record");
        }
        self.state = SupervisorState::Stopped;
    }

    fn daemon_alive(&mut self) -> bool {
        match &mut self.handle {
            Some(handle) => handle.is_alive(),
            None => false,
        }
    }

    /// Drop the handle and record for a daemon that no longer exists.
    fn forget_daemon(&mut self) {
        self.handle = None;
        if let Err(e) = statefile::clear_record(&self.config.state_dir) {
            warn!(error = %e, "failed to clear daemon record");
        }
        self.state = SupervisorState::Stopped;
    }
}
