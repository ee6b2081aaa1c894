//! `mvstray` - tray launcher for the Metaverse node.
//!
//! The launcher takes no flags of its own. Its whole command line (minus an
//! optional leading `ui`) is forwarded to the `mvsd` daemon it supervises:
//!
//! ```text
//! mvstray ui --pruning=fast    # daemon sees exactly: --pruning=fast
//! ```

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use mvstray_core::SystemBrowser;

mod args;
mod config;
mod launcher;
mod lock;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let forwarded = args::forwarded_args(std::env::args());
    let config = config::load()?;
    let state_dir = mvstray_paths::data_dir();

    let cancel = CancellationToken::new();
    tokio::spawn(quit_signal(cancel.clone()));

    let ui = SystemBrowser;
    match launcher::run(&config, forwarded, &state_dir, &ui, cancel).await? {
        launcher::RunOutcome::AlreadyRunning | launcher::RunOutcome::Quit => Ok(()),
        launcher::RunOutcome::DaemonDied => {
            anyhow::bail!("daemon exited unexpectedly; launcher shutting down")
        }
    }
}

/// Cancel the token once the user asks us to quit (Ctrl-C, or SIGTERM on
/// Unix). A failure to install a listener leaves the token alone; it must
/// never read as a quit request.
async fn quit_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            warn!(error = %e, "cannot listen for Ctrl-C");
                            return;
                        }
                    }
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM; Ctrl-C only");
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
    }
    info!("shutdown signal received");
    cancel.cancel();
}
