//! Launcher configuration.
//!
//! An optional TOML file at `<config_dir>/config.toml`. Every field has a
//! default, so a missing file yields a fully working launcher. This file only
//! configures the launcher itself; nothing in it is ever turned into a daemon
//! command-line argument.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use mvstray_core::supervisor::{READY_CHECK_INTERVAL, READY_TIMEOUT};
use mvstray_core::{DEFAULT_DAEMON_NAME, DEFAULT_RPC_PORT, DaemonConfig};

const CONFIG_FILE: &str = "config.toml";

/// Raw launcher configuration as it appears on disk (everything optional).
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub daemon: RawDaemonSection,
    #[serde(default)]
    pub readiness: RawReadinessSection,
    #[serde(default)]
    pub autostart: RawAutostartSection,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawDaemonSection {
    /// Explicit daemon binary path. Unset means sibling-then-PATH lookup.
    pub binary: Option<PathBuf>,
    /// Daemon process name. Unset follows `binary`'s file name, then "mvsd".
    pub name: Option<String>,
    pub port: Option<u16>,
    pub seed_defaults: Option<bool>,
    pub defaults_path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawReadinessSection {
    pub timeout_secs: Option<u64>,
    pub check_interval_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawAutostartSection {
    /// Desired login-item state. Unset leaves the registration alone.
    pub enabled: Option<bool>,
}

/// Launcher configuration with all defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct LauncherConfig {
    pub daemon_binary: Option<PathBuf>,
    pub daemon_name: String,
    pub port: u16,
    pub seed_defaults: bool,
    pub defaults_path: PathBuf,
    pub ready_timeout: Duration,
    pub ready_check_interval: Duration,
    pub autostart: Option<bool>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        finalize(RawConfig::default())
    }
}

impl LauncherConfig {
    /// Build the supervisor's daemon config, attaching the forwarded
    /// command-line `args`.
    pub fn daemon_config(&self, args: Vec<String>) -> DaemonConfig {
        let mut config = DaemonConfig::default()
            .with_name(self.daemon_name.clone())
            .with_port(self.port)
            .with_args(args)
            .with_ready_timeout(self.ready_timeout)
            .with_ready_check_interval(self.ready_check_interval);
        if let Some(binary) = &self.daemon_binary {
            config = config.with_binary(binary.clone());
        }
        config
    }
}

/// Load the launcher configuration from the user config directory.
pub fn load() -> Result<LauncherConfig> {
    load_from_path(&mvstray_paths::config_dir().join(CONFIG_FILE))
}

/// Load the launcher configuration from a specific path.
///
/// A missing file is not an error; it means defaults.
pub fn load_from_path(path: &Path) -> Result<LauncherConfig> {
    if !path.exists() {
        return Ok(LauncherConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;
    let raw: RawConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config from {}", path.display()))?;
    Ok(finalize(raw))
}

fn finalize(raw: RawConfig) -> LauncherConfig {
    let daemon_name = daemon_name(&raw.daemon);
    LauncherConfig {
        daemon_binary: raw.daemon.binary,
        daemon_name,
        port: raw.daemon.port.unwrap_or(DEFAULT_RPC_PORT),
        seed_defaults: raw.daemon.seed_defaults.unwrap_or(true),
        defaults_path: raw.daemon.defaults_path.unwrap_or_else(default_defaults_path),
        ready_timeout: raw
            .readiness
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(READY_TIMEOUT),
        ready_check_interval: raw
            .readiness
            .check_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(READY_CHECK_INTERVAL),
        autostart: raw.autostart.enabled,
    }
}

/// Name used for process-table scans and `$PATH` lookup: explicit `name`,
/// else the configured binary's file name, else the stock daemon name.
fn daemon_name(daemon: &RawDaemonSection) -> String {
    if let Some(name) = &daemon.name {
        return name.clone();
    }
    daemon
        .binary
        .as_deref()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .unwrap_or_else(|| DEFAULT_DAEMON_NAME.to_string())
}

/// Where the node expects its seeded defaults: `~/.metaverse/defaults.json`.
fn default_defaults_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".metaverse")
        .join("defaults.json")
}
