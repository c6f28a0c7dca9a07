//! [`RoleStore`] implementations.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::paths;
use crate::roles::RolePreset;
use crate::RoleStore;

/// Layout of the roles file: a `[[roles]]` array of tables.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RolesFile {
    #[serde(default)]
    roles: Vec<RolePreset>,
}

/// Custom roles kept in a TOML file.
#[derive(Debug, Clone)]
pub struct TomlRoleStore {
    path: PathBuf,
}

impl TomlRoleStore {
    /// Use the roles file in the user's configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no configuration directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(paths::roles_path()?))
    }

    /// Use the roles file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the roles file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RoleStore for TomlRoleStore {
    fn load_custom(&self) -> Result<Vec<RolePreset>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        let file: RolesFile =
            toml::from_str(&contents).map_err(|e| StoreError::parse(&self.path, e))?;

        debug!(path = %self.path.display(), count = file.roles.len(), "custom roles loaded");
        Ok(file.roles)
    }

    fn save_custom(&self, roles: &[RolePreset]) -> Result<()> {
        if roles.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StoreError::io(&self.path, e)),
            };
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let file = RolesFile {
            roles: roles.to_vec(),
        };
        let contents = toml::to_string_pretty(&file)?;
        fs::write(&self.path, contents).map_err(|e| StoreError::io(&self.path, e))
    }
}

/// Custom roles kept in memory, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryRoleStore {
    roles: Mutex<Vec<RolePreset>>,
}

impl MemoryRoleStore {
    /// Start with `roles` already saved.
    #[must_use]
    pub fn with_roles(roles: Vec<RolePreset>) -> Self {
        Self {
            roles: Mutex::new(roles),
        }
    }

    /// The currently saved roles.
    #[must_use]
    pub fn roles(&self) -> Vec<RolePreset> {
        self.roles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RoleStore for MemoryRoleStore {
    fn load_custom(&self) -> Result<Vec<RolePreset>> {
        Ok(self.roles())
    }

    fn save_custom(&self, roles: &[RolePreset]) -> Result<()> {
        *self.roles.lock().unwrap_or_else(PoisonError::into_inner) = roles.to_vec();
        Ok(())
    }
}
