//! Daemon supervision core for mvstray.
//!
//! This crate supervises a locally-run Metaverse node (`mvsd`): it adopts a
//! daemon that is already running or spawns a fresh one, waits for its RPC
//! port to open, checks liveness on a tick, and tears it down forcefully on
//! quit. The OS seams the launcher needs (process table, default browser,
//! login items) sit behind small traits so everything above them is
//! testable without a desktop.
//!
//! # Key Types
//!
//! - [`DaemonSupervisor`] - Owns the daemon lifecycle state machine
//! - [`DaemonConfig`] - Where the daemon lives and how patiently we wait
//! - [`DaemonHandle`] - Spawned-or-adopted process identity
//! - [`ProcessRegistry`] - Process-table lookup, fakeable for tests
//! - [`UiBridge`] / [`AutostartRegistry`] - Browser and login-item seams

pub mod autostart;
pub mod defaults;
pub mod error;
pub mod handle;
pub mod probe;
pub mod process;
pub mod registry;
pub mod statefile;
pub mod supervisor;
pub mod ui;

// Re-exports
pub use autostart::{AutostartRegistry, LoginItems};
pub use defaults::{NodeDefaults, NodeMode, PruningMode};
pub use error::{Error, Result};
pub use handle::{DaemonHandle, DaemonProcess};
pub use probe::ReadinessState;
pub use registry::{ProcessRegistry, SystemProcessRegistry};
pub use statefile::DaemonRecord;
pub use supervisor::{
    DEFAULT_DAEMON_NAME, DEFAULT_RPC_PORT, DaemonConfig, DaemonSupervisor, Launch, ReadyOutcome,
    SupervisorState,
};
pub use ui::{SystemBrowser, UiBridge, ui_url};
