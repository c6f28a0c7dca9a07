//! Locations of the files sai keeps between runs.

use std::path::PathBuf;

use crate::error::{Result, StoreError};

/// Directory name under the platform configuration directory.
pub const APP_DIR: &str = "sai";

/// Settings file name.
pub const SETTINGS_FILE: &str = "config.toml";

/// Custom roles file name.
pub const ROLES_FILE: &str = "roles.toml";

/// The sai configuration directory (e.g. `~/.config/sai` on Linux).
///
/// # Errors
///
/// Returns [`StoreError::NoConfigDir`] if the platform has none.
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(StoreError::NoConfigDir)
}

/// Default path of the settings file.
///
/// # Errors
///
/// Returns [`StoreError::NoConfigDir`] if the platform has none.
pub fn settings_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(SETTINGS_FILE))
}

/// Default path of the custom roles file.
///
/// # Errors
///
/// Returns [`StoreError::NoConfigDir`] if the platform has none.
pub fn roles_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(ROLES_FILE))
}
