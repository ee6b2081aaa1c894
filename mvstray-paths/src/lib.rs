//! Filesystem locations for launcher state.
//!
//! Everything mvstray persists lives in a per-user `mvstray/` directory
//! resolved through the XDG base-directory variables: the launcher's own
//! config under the config root, runtime records (singleton lock, daemon
//! record) under the data root. The supervised node's data directory is
//! not ours; nothing here points into it.

use std::path::PathBuf;

/// Directory name scoping every path to this application.
const APP_DIR: &str = "mvstray";

/// The launcher's config directory: `$XDG_CONFIG_HOME/mvstray`, usually
/// `~/.config/mvstray`. Holds `config.toml`.
///
/// # Examples
///
/// ```
/// let config_file = mvstray_paths::config_dir().join("config.toml");
/// assert!(config_file.ends_with("mvstray/config.toml"));
/// ```
pub fn config_dir() -> PathBuf {
    under("XDG_CONFIG_HOME", ".config")
}

/// The launcher's data directory: `$XDG_DATA_HOME/mvstray`, usually
/// `~/.local/share/mvstray`. Holds the singleton lock and the daemon
/// record.
///
/// # Examples
///
/// ```
/// let lock_file = mvstray_paths::data_dir().join("launcher.lock");
/// assert!(lock_file.ends_with("mvstray/launcher.lock"));
/// ```
pub fn data_dir() -> PathBuf {
    under("XDG_DATA_HOME", ".local/share")
}

/// Resolve `$var`/mvstray, falling back to `~/<home_suffix>/mvstray` and,
/// on systems with no resolvable home, a relative path.
fn under(var: &str, home_suffix: &str) -> PathBuf {
    let root = match std::env::var(var) {
        Ok(explicit) => PathBuf::from(explicit),
        Err(_) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(home_suffix),
    };
    root.join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_dir_is_scoped_to_the_app() {
        assert!(config_dir().ends_with(APP_DIR));
        assert!(data_dir().ends_with(APP_DIR));
    }

    #[test]
    fn test_config_dir_honors_xdg_override() {
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", "/tmp/mvstray-conf-root");
        }
        assert_eq!(config_dir(), PathBuf::from("/tmp/mvstray-conf-root/mvstray"));
        unsafe {
            std::env::remove_var("XDG_CONFIG_HOME");
        }
    }

    #[test]
    fn test_data_dir_honors_xdg_override() {
        unsafe {
            std::env::set_var("XDG_DATA_HOME", "/tmp/mvstray-data-root");
        }
        assert_eq!(data_dir(), PathBuf::from("/tmp/mvstray-data-root/mvstray"));
        unsafe {
            std::env::remove_var("XDG_DATA_HOME");
        }
    }
}
