//! TCP readiness probing.
//!
//! The daemon is considered ready once something accepts connections on its
//! RPC port on localhost. Nothing beyond "TCP connect succeeds" is
//! inspected.

use std::time::Duration;

use tokio::net::TcpStream;
use tracing::trace;

/// Upper bound on a single connect attempt. A filtered or unresponsive port
/// must fail the probe, not stall it.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Result of one readiness probe. Derived each time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    /// Nothing is accepting connections on the port.
    NotReady,
    /// A listener accepted our connection.
    Ready,
}

/// Check whether something is listening on `127.0.0.1:port`.
///
/// Connection refused is a normal `false` result, not an error; so is an
/// attempt that exceeds [`CONNECT_TIMEOUT`]. No side effects beyond the
/// probe connection itself, which is dropped immediately.
pub async fn is_port_open(port: u16) -> bool {
    let addr = format!("127.0.0.1:{port}");
    match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
        Ok(Ok(_stream)) => true,
        Ok(Err(e)) => {
            trace!(port, error = %e, "readiness probe: connect failed");
            false
        }
        Err(_) => {
            trace!(port, "readiness probe: connect timed out");
            false
        }
    }
}

/// Probe the port once and fold the result into a [`ReadinessState`].
pub async fn check(port: u16) -> ReadinessState {
    if is_port_open(port).await {
        ReadinessState::Ready
    } else {
        ReadinessState::NotReady
    }
}
