//! Connection and session settings.
//!
//! Each setting is resolved independently: a value in the settings file
//! wins over an environment variable, which wins over the built-in default.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sai_core::ModelName;

use crate::error::{Result, StoreError};
use crate::paths;
use crate::roles::DEFAULT_ROLE_NAME;

/// Default Ollama endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Timeout for connecting to Ollama and for each read.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable holding the Ollama URL.
pub const ENV_URL: &str = "OLLAMA_URL";

/// Environment variable holding the model name.
pub const ENV_MODEL: &str = "OLLAMA_MODEL";

/// Environment variable holding the active role.
pub const ENV_ROLE: &str = "SAI_ROLE";

/// Effective settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Ollama base URL.
    pub base_url: String,
    /// Selected model, if one has been chosen.
    pub model: Option<ModelName>,
    /// Name of the active role preset.
    pub role: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: None,
            role: DEFAULT_ROLE_NAME.to_string(),
        }
    }
}

impl Settings {
    /// Merge the settings file with the environment.
    ///
    /// `env` looks up a variable by name; blank values count as unset.
    pub fn resolve<F>(file: &SettingsFile, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let model = file.model.clone().or_else(|| {
            env(ENV_MODEL).and_then(|value| match ModelName::new(value.trim()) {
                Ok(model) => Some(model),
                Err(err) => {
                    warn!(error = %err, "ignoring {ENV_MODEL}");
                    None
                }
            })
        });

        Self {
            base_url: file
                .base_url
                .clone()
                .or_else(|| env(ENV_URL))
                .unwrap_or(defaults.base_url),
            model,
            role: file
                .role
                .clone()
                .or_else(|| env(ENV_ROLE))
                .unwrap_or(defaults.role),
        }
    }

    /// The form written back to the settings file.
    #[must_use]
    pub fn to_file(&self) -> SettingsFile {
        SettingsFile {
            base_url: Some(self.base_url.clone()),
            model: self.model.clone(),
            role: Some(self.role.clone()),
        }
    }
}

/// On-disk settings; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsFile {
    /// Ollama base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelName>,
    /// Active role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Reads and writes the settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Use the settings file in the user's configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no configuration directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(paths::settings_path()?))
    }

    /// Use the settings file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the settings file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file; a missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn read_file(&self) -> Result<SettingsFile> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                toml::from_str(&contents).map_err(|e| StoreError::parse(&self.path, e))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no settings file");
                Ok(SettingsFile::default())
            }
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    /// Load the effective settings using the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file cannot be read or parsed.
    pub fn load(&self) -> Result<Settings> {
        let file = self.read_file()?;
        Ok(Settings::resolve(&file, |name| std::env::var(name).ok()))
    }

    /// Write `settings`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let contents = toml::to_string_pretty(&settings.to_file())?;
        fs::write(&self.path, contents).map_err(|e| StoreError::io(&self.path, e))?;

        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}
