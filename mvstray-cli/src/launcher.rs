//! The launcher run loop.
//!
//! One pass through a launcher's life: take the singleton lock (or hand off
//! to the instance that has it), adopt or spawn the daemon, wait for its RPC
//! port, open the UI exactly once, then sit on a liveness tick until the
//! daemon dies or the user quits.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use mvstray_core::supervisor::LIVENESS_INTERVAL;
use mvstray_core::{
    AutostartRegistry, DaemonSupervisor, Launch, LoginItems, NodeDefaults, ReadyOutcome,
    SystemProcessRegistry, UiBridge, defaults, ui_url,
};

use crate::config::LauncherConfig;
use crate::lock::{self, LockOutcome};

/// Name the launcher registers under in the OS login items.
pub const APP_NAME: &str = "Metaverse";

/// How a launcher run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another launcher owns the daemon; we only opened the UI.
    AlreadyRunning,
    /// The user quit; the daemon was torn down on the way out.
    Quit,
    /// The daemon disappeared; the launcher has no reason to stay.
    DaemonDied,
}

/// Run one launcher lifecycle.
///
/// `forwarded` is the daemon's verbatim command line, `state_dir` holds the
/// lock and daemon record, and `cancel` is the quit signal. Readiness
/// failures kill anything we spawned and return an error; a daemon that dies
/// later is reported as [`RunOutcome::DaemonDied`] so callers decide the exit
/// code.
pub async fn run(
    config: &LauncherConfig,
    forwarded: Vec<String>,
    state_dir: &Path,
    ui: &dyn UiBridge,
    cancel: CancellationToken,
) -> Result<RunOutcome> {
    match lock::acquire(state_dir).context("failed to take the launcher lock")? {
        LockOutcome::AlreadyRunning { pid } => {
            info!(pid, "another launcher instance is running; opening UI only");
            ui.open_ui(&ui_url(config.port));
            Ok(RunOutcome::AlreadyRunning)
        }
        LockOutcome::Acquired(guard) => {
            let outcome = supervise(config, forwarded, state_dir, ui, cancel).await;
            drop(guard);
            outcome
        }
    }
}

/// The supervising side of [`run`], entered only by the lock holder.
async fn supervise(
    config: &LauncherConfig,
    forwarded: Vec<String>,
    state_dir: &Path,
    ui: &dyn UiBridge,
    cancel: CancellationToken,
) -> Result<RunOutcome> {
    if config.seed_defaults {
        seed_node_defaults(&config.defaults_path);
    }
    if let Some(desired) = config.autostart {
        sync_autostart(&forwarded, desired);
    }

    let daemon_config = config
        .daemon_config(forwarded)
        .with_state_dir(state_dir);
    let port = daemon_config.port;
    let mut supervisor =
        DaemonSupervisor::new(daemon_config, Box::new(SystemProcessRegistry::new()));

    match supervisor.launch().context("failed to launch daemon")? {
        Launch::Adopted { .. } => {}
        Launch::Spawned { pid } => {
            debug!(pid, port, "waiting for daemon RPC port");
            match supervisor.wait_ready(&cancel).await {
                ReadyOutcome::Ready => {}
                ReadyOutcome::Cancelled => {
                    supervisor.terminate();
                    return Ok(RunOutcome::Quit);
                }
                ReadyOutcome::TimedOut => {
                    supervisor.terminate();
                    bail!(
                        "daemon did not open port {} within {:?}",
                        port,
                        config.ready_timeout
                    );
                }
                ReadyOutcome::Exited => {
                    bail!("daemon exited before opening port {port}");
                }
            }
        }
    }

    // One UI open per lifecycle, whichever way we got a running daemon.
    ui.open_ui(&ui_url(port));

    let mut ticker = tokio::time::interval(LIVENESS_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !supervisor.check_daemon() {
                    error!("daemon died; shutting down");
                    return Ok(RunOutcome::DaemonDied);
                }
            }
            _ = cancel.cancelled() => {
                info!("quit requested; stopping daemon");
                supervisor.terminate();
                return Ok(RunOutcome::Quit);
            }
        }
    }
}

/// Write the node's defaults file if it does not exist yet. Best effort: the
/// daemon runs fine without it.
fn seed_node_defaults(path: &Path) {
    match defaults::seed(path, &NodeDefaults::default()) {
        Ok(true) => info!(path = %path.display(), "seeded node defaults"),
        Ok(false) => debug!(path = %path.display(), "node defaults already present"),
        Err(e) => warn!(error = %e, path = %path.display(), "failed to seed node defaults"),
    }
}

/// Bring the login-item registration in line with the configured state.
/// Best effort: a broken autostart store must not keep the node down.
fn sync_autostart(forwarded: &[String], desired: bool) {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => {
            warn!(error = %e, "cannot resolve launcher path for autostart");
            return;
        }
    };
    let result = LoginItems::new(APP_NAME, &exe, forwarded)
        .and_then(|items| ensure_autostart(&items, desired));
    match result {
        Ok(true) => info!(desired, "updated autostart registration"),
        Ok(false) => debug!(desired, "autostart registration already as configured"),
        Err(e) => warn!(error = %e, "failed to update autostart registration"),
    }
}

/// Flip the registration only when it differs from `desired`. Returns whether
/// anything changed.
fn ensure_autostart(
    registry: &dyn AutostartRegistry,
    desired: bool,
) -> mvstray_core::Result<bool> {
    if registry.is_enabled()? == desired {
        return Ok(false);
    }
    if desired {
        registry.enable()?;
    } else {
        registry.disable()?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tempfile::TempDir;

    use mvstray_core::process::is_process_alive;
    use mvstray_core::statefile::read_record;

    use crate::lock::{LockRecord, lock_path};

    /// UI seam that counts opens instead of launching a browser.
    #[derive(Default)]
    struct RecordingUi {
        urls: Mutex<Vec<String>>,
    }

    impl RecordingUi {
        fn opens(&self) -> usize {
            self.urls.lock().unwrap().len()
        }
    }

    impl UiBridge for RecordingUi {
        fn open_ui(&self, url: &str) {
            self.urls.lock().unwrap().push(url.to_string());
        }
    }

    fn test_launcher_config(binary: &Path, port: u16) -> LauncherConfig {
        let mut config = LauncherConfig::default();
        config.daemon_binary = Some(binary.to_path_buf());
        config.port = port;
        config.seed_defaults = false;
        config.autostart = None;
        config.ready_timeout = Duration::from_secs(10);
        config.ready_check_interval = Duration::from_millis(50);
        config
    }

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    /// Poll `cond` until it holds or ten seconds pass.
    async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while tokio::time::Instant::now() < deadline {
            if cond() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        false
    }

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_start_opens_ui_once_and_quit_kills_daemon() {
        let dir = TempDir::new().unwrap();
        let daemon = write_script(dir.path(), "mvsd", "#!/bin/sh\nexec sleep 30\n");
        // The test holds the port open so readiness passes immediately.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = test_launcher_config(&daemon, port);
        let ui = RecordingUi::default();
        let cancel = CancellationToken::new();

        let driver = async {
            assert!(wait_until(|| ui.opens() == 1).await, "UI never opened");
            let record = read_record(dir.path()).expect("daemon record missing");
            assert!(is_process_alive(record.pid));
            cancel.cancel();
            record.pid
        };
        let (outcome, pid) = tokio::join!(
            run(&config, Vec::new(), dir.path(), &ui, cancel.clone()),
            driver
        );

        assert_eq!(outcome.unwrap(), RunOutcome::Quit);
        assert_eq!(ui.opens(), 1);
        assert_eq!(
            ui.urls.lock().unwrap()[0],
            format!("http://127.0.0.1:{port}")
        );
        assert!(!is_process_alive(pid));
        assert!(read_record(dir.path()).is_none());
        assert!(!lock_path(dir.path()).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_daemon_death_ends_the_run_without_reopening_ui() {
        let dir = TempDir::new().unwrap();
        let daemon = write_script(dir.path(), "mvsd", "#!/bin/sh\nexec sleep 1\n");
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = test_launcher_config(&daemon, port);
        let ui = RecordingUi::default();
        let cancel = CancellationToken::new();

        let outcome = run(&config, Vec::new(), dir.path(), &ui, cancel).await;

        assert_eq!(outcome.unwrap(), RunOutcome::DaemonDied);
        assert_eq!(ui.opens(), 1);
        assert!(read_record(dir.path()).is_none());
        assert!(!lock_path(dir.path()).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_second_instance_opens_ui_and_never_spawns() {
        let dir = TempDir::new().unwrap();
        // A live foreign process stands in for the first launcher.
        let mut first = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();
        let record = LockRecord {
            pid: first.id(),
            started_at: chrono::Utc::now(),
        };
        std::fs::write(
            lock_path(dir.path()),
            serde_json::to_string(&record).unwrap(),
        )
        .unwrap();

        // A missing binary would make any spawn attempt fail loudly.
        let config = test_launcher_config(Path::new("/nonexistent/mvsd"), free_port());
        let ui = RecordingUi::default();
        let cancel = CancellationToken::new();

        let outcome = run(&config, Vec::new(), dir.path(), &ui, cancel).await;

        assert_eq!(outcome.unwrap(), RunOutcome::AlreadyRunning);
        assert_eq!(ui.opens(), 1);
        assert!(read_record(dir.path()).is_none());
        assert!(is_process_alive(first.id()));
        // The holder's lock must survive us.
        assert!(lock_path(dir.path()).exists());

        first.kill().unwrap();
        first.wait().unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_readiness_timeout_kills_daemon_and_fails() {
        let dir = TempDir::new().unwrap();
        let daemon = write_script(dir.path(), "mvsd", "#!/bin/sh\nexec sleep 30\n");

        let mut config = test_launcher_config(&daemon, free_port());
        // Long enough for the driver to read the record before the kill.
        config.ready_timeout = Duration::from_secs(2);
        let ui = RecordingUi::default();
        let cancel = CancellationToken::new();

        let driver = async {
            assert!(
                wait_until(|| read_record(dir.path()).is_some()).await,
                "daemon record never written"
            );
            read_record(dir.path()).map(|record| record.pid)
        };
        let (outcome, pid) = tokio::join!(
            run(&config, Vec::new(), dir.path(), &ui, cancel.clone()),
            driver
        );

        assert!(outcome.is_err());
        assert_eq!(ui.opens(), 0);
        assert!(!is_process_alive(pid.unwrap()));
        assert!(read_record(dir.path()).is_none());
        assert!(!lock_path(dir.path()).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_quit_during_readiness_wait_kills_daemon() {
        let dir = TempDir::new().unwrap();
        let daemon = write_script(dir.path(), "mvsd", "#!/bin/sh\nexec sleep 30\n");

        let config = test_launcher_config(&daemon, free_port());
        let ui = RecordingUi::default();
        let cancel = CancellationToken::new();

        let driver = async {
            assert!(
                wait_until(|| read_record(dir.path()).is_some()).await,
                "daemon record never written"
            );
            let pid = read_record(dir.path()).map(|record| record.pid);
            cancel.cancel();
            pid
        };
        let (outcome, pid) = tokio::join!(
            run(&config, Vec::new(), dir.path(), &ui, cancel.clone()),
            driver
        );

        assert_eq!(outcome.unwrap(), RunOutcome::Quit);
        assert_eq!(ui.opens(), 0);
        assert!(!is_process_alive(pid.unwrap()));
        assert!(read_record(dir.path()).is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_daemon_exiting_before_ready_fails_the_run() {
        let dir = TempDir::new().unwrap();
        let daemon = write_script(dir.path(), "mvsd", "#!/bin/sh\nexit 7\n");

        let config = test_launcher_config(&daemon, free_port());
        let ui = RecordingUi::default();
        let cancel = CancellationToken::new();

        let outcome = run(&config, Vec::new(), dir.path(), &ui, cancel).await;

        assert!(outcome.is_err());
        assert_eq!(ui.opens(), 0);
        assert!(read_record(dir.path()).is_none());
        assert!(!lock_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn test_defaults_are_seeded_on_supervised_start() {
        let dir = TempDir::new().unwrap();
        let defaults_path = dir.path().join("chain").join("defaults.json");

        let mut config =
            test_launcher_config(Path::new("/nonexistent/mvsd"), free_port());
        config.seed_defaults = true;
        config.defaults_path = defaults_path.clone();
        let ui = RecordingUi::default();
        let cancel = CancellationToken::new();

        // Launch fails (no binary anywhere), but seeding happens first.
        let outcome = run(&config, Vec::new(), dir.path(), &ui, cancel).await;
        assert!(outcome.is_err());
        assert!(defaults_path.exists());
    }

    struct MemoryAutostart {
        enabled: AtomicBool,
    }

    impl MemoryAutostart {
        fn new(enabled: bool) -> Self {
            Self {
                enabled: AtomicBool::new(enabled),
            }
        }
    }

    impl AutostartRegistry for MemoryAutostart {
        fn is_enabled(&self) -> mvstray_core::Result<bool> {
            Ok(self.enabled.load(Ordering::SeqCst))
        }

        fn enable(&self) -> mvstray_core::Result<()> {
            self.enabled.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn disable(&self) -> mvstray_core::Result<()> {
            self.enabled.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_ensure_autostart_enables_when_off() {
        let registry = MemoryAutostart::new(false);
        assert!(ensure_autostart(&registry, true).unwrap());
        assert!(registry.is_enabled().unwrap());
    }

    #[test]
    fn test_ensure_autostart_disables_when_on() {
        let registry = MemoryAutostart::new(true);
        assert!(ensure_autostart(&registry, false).unwrap());
        assert!(!registry.is_enabled().unwrap());
    }

    #[test]
    fn test_ensure_autostart_is_idempotent() {
        let registry = MemoryAutostart::new(true);
        assert!(!ensure_autostart(&registry, true).unwrap());
        assert!(registry.is_enabled().unwrap());
    }
}
