//! Default configuration seeded for the supervised node.
//!
//! The launcher provisions a small set of node options on first launch by
//! writing them to the node's data directory. The node owns the file from
//! then on: an existing file is never touched, and nothing here is ever
//! turned into a command-line flag (the daemon's argument vector is the
//! user's, forwarded verbatim).

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Node operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeMode {
    /// Participate fully in the network.
    Active,
    /// Serve and sync without active participation.
    Passive,
    /// Sync without serving peers.
    Dark,
    /// No network activity.
    Offline,
}

/// State-database pruning strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PruningMode {
    /// Keep full state history.
    Archive,
    /// Keep recent state only.
    Fast,
}

/// Node options the launcher provisions on first start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefaults {
    /// Maintain the full state database.
    #[serde(default = "default_fat_db")]
    pub fat_db: bool,
    /// Operating mode.
    #[serde(default = "default_mode")]
    pub mode: NodeMode,
    /// Seconds of inactivity before the mode alarm fires.
    #[serde(rename = "mode.alarm", default = "default_mode_alarm")]
    pub mode_alarm: u64,
    /// Seconds before a mode transition times out.
    #[serde(rename = "mode.timeout", default = "default_mode_timeout")]
    pub mode_timeout: u64,
    /// Pruning strategy.
    #[serde(default = "default_pruning")]
    pub pruning: PruningMode,
    /// Enable execution tracing.
    #[serde(default = "default_tracing")]
    pub tracing: bool,
}

fn default_fat_db() -> bool {
    false
}

fn default_mode() -> NodeMode {
    NodeMode::Passive
}

fn default_mode_alarm() -> u64 {
    3600
}

fn default_mode_timeout() -> u64 {
    300
}

fn default_pruning() -> PruningMode {
    PruningMode::Fast
}

fn default_tracing() -> bool {
    false
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            fat_db: default_fat_db(),
            mode: default_mode(),
            mode_alarm: default_mode_alarm(),
            mode_timeout: default_mode_timeout(),
            pruning: default_pruning(),
            tracing: default_tracing(),
        }
    }
}

/// Write `defaults` as pretty JSON to `path` unless a file already exists.
///
/// Returns whether a file was written. Creates parent directories as
/// needed; never overwrites, the node's own edits win over our defaults.
pub fn seed(path: &Path, defaults: &NodeDefaults) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(defaults)?;
    fs::write(path, content)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_serialize_to_expected_blob() {
        let value = serde_json::to_value(NodeDefaults::default()).unwrap();

        assert_eq!(value["fat_db"], serde_json::json!(false));
        assert_eq!(value["mode"], serde_json::json!("passive"));
        assert_eq!(value["mode.alarm"], serde_json::json!(3600));
        assert_eq!(value["mode.timeout"], serde_json::json!(300));
        assert_eq!(value["pruning"], serde_json::json!("fast"));
        assert_eq!(value["tracing"], serde_json::json!(false));
        assert_eq!(value.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_partial_blob_fills_in_defaults() {
        let parsed: NodeDefaults = serde_json::from_str(r#"{"mode":"active"}"#).unwrap();
        assert_eq!(parsed.mode, NodeMode::Active);
        assert_eq!(parsed.pruning, PruningMode::Fast);
        assert_eq!(parsed.mode_alarm, 3600);
    }

    #[test]
    fn test_seed_writes_once() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("node/defaults.json");

        assert!(seed(&path, &NodeDefaults::default()).unwrap());
        let first = fs::read_to_string(&path).unwrap();

        // A second seed must leave the file untouched.
        assert!(!seed(&path, &NodeDefaults::default()).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_seed_never_overwrites_existing_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("defaults.json");
        fs::write(&path, r#"{"mode":"dark"}"#).unwrap();

        assert!(!seed(&path, &NodeDefaults::default()).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"mode":"dark"}"#);
    }
}
