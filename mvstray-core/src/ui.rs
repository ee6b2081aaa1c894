//! Opening the daemon's web UI.

use tracing::{info, warn};

/// Build the daemon's web-UI URL for `port`.
pub fn ui_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}

/// Opens the daemon's UI for the user.
///
/// Best-effort and fire-and-forget: implementations log failures and never
/// propagate them. A browser that refuses to open must not take the
/// supervisor down with it.
pub trait UiBridge {
    /// Open `url` in the user's preferred front-end.
    fn open_ui(&self, url: &str);
}

/// [`UiBridge`] that hands the URL to the default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl UiBridge for SystemBrowser {
    fn open_ui(&self, url: &str) {
        info!(url, "opening web UI");
        if let Err(e) = open::that_detached(url) {
            warn!(url, error = %e, "failed to open web UI");
        }
    }
}
