//! Launch-at-login registration.

use std::path::Path;

use auto_launch::{AutoLaunch, AutoLaunchBuilder};

use crate::error::Result;

/// OS "launch at login" registration for the launcher.
///
/// The state lives in the OS store (login items, run key, desktop entry)
/// and is never cached here; every query goes to the store. Abstracted so
/// callers can be tested without touching the real store.
pub trait AutostartRegistry {
    /// Whether the launcher is currently registered to start at login.
    fn is_enabled(&self) -> Result<bool>;

    /// Register the launcher to start at login.
    fn enable(&self) -> Result<()>;

    /// Remove the launcher's start-at-login registration.
    fn disable(&self) -> Result<()>;

    /// Flip the registration and return the new state.
    fn toggle(&self) -> Result<bool> {
        if self.is_enabled()? {
            self.disable()?;
            Ok(false)
        } else {
            self.enable()?;
            Ok(true)
        }
    }
}

/// [`AutostartRegistry`] backed by the platform store: login items on
/// macOS, a registry run key on Windows, a desktop entry on Linux.
pub struct LoginItems {
    inner: AutoLaunch,
}

impl LoginItems {
    /// Register under `app_name` for the executable at `app_path`.
    ///
    /// `args` are stored alongside the registration so a login-time start
    /// repeats the invocation the user originally made.
    pub fn new(app_name: &str, app_path: &Path, args: &[String]) -> Result<Self> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let inner = AutoLaunchBuilder::new()
            .set_app_name(app_name)
            .set_app_path(&app_path.to_string_lossy())
            .set_args(&args)
            .build()?;
        Ok(Self { inner })
    }
}

impl AutostartRegistry for LoginItems {
    fn is_enabled(&self) -> Result<bool> {
        Ok(self.inner.is_enabled()?)
    }

    fn enable(&self) -> Result<()> {
        Ok(self.inner.enable()?)
    }

    fn disable(&self) -> Result<()> {
        Ok(self.inner.disable()?)
    }
}
