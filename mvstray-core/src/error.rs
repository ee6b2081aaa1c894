//! Error types for daemon supervision.

use thiserror::Error;

/// Errors surfaced by the supervision core.
///
/// Readiness outcomes (timed out, cancelled, daemon exited early) are not
/// errors at this layer; they are reported as
/// [`ReadyOutcome`](crate::supervisor::ReadyOutcome) values and mapped by the
/// caller. Kill delivery to an already-dead PID is swallowed, never surfaced.
#[derive(Debug, Error)]
pub enum Error {
    /// No daemon executable could be located.
    #[error("daemon binary not found: {0}")]
    BinaryNotFound(String),

    /// Spawning the daemon process failed (permissions, bad binary, ...).
    #[error("failed to spawn daemon: {0}")]
    Spawn(#[from] std::io::Error),

    /// The OS login-item store rejected an autostart operation.
    #[error("autostart registry error: {0}")]
    Autostart(#[from] auto_launch::Error),
}

/// Convenience result type for supervision operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_not_found_display() {
        let err = Error::BinaryNotFound("mvsd".to_string());
        assert_eq!(err.to_string(), "daemon binary not found: mvsd");
    }

    #[test]
    fn test_spawn_display_includes_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::Spawn(io);
        assert!(err.to_string().contains("failed to spawn daemon"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_io_error_converts_to_spawn() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(Error::Spawn(_))));
    }
}
