//! Settings and role storage for sai.
//!
//! This crate keeps the state sai remembers between runs, as TOML files in
//! the user's configuration directory:
//!
//! - `config.toml`: Ollama URL, selected model and active role
//! - `roles.toml`: user-defined role presets (`[[roles]]` tables)
//!
//! Settings fall back to `OLLAMA_URL`, `OLLAMA_MODEL` and `SAI_ROLE`, then to
//! built-in defaults.
//!
//! # Example
//!
//! ```
//! use sai_store::{MemoryRoleStore, RoleCatalog};
//!
//! let mut roles = RoleCatalog::load(MemoryRoleStore::default()).unwrap();
//! roles.add("Pirate", "Talk like a pirate.").unwrap();
//!
//! assert_eq!(roles.default_role().name, "Virtual Assistant");
//! assert!(roles.get("Pirate").is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod files;
pub mod paths;
pub mod roles;
pub mod settings;

pub use error::{Result, StoreError};
pub use files::{MemoryRoleStore, TomlRoleStore};
pub use roles::{builtin_roles, RoleCatalog, RolePreset, DEFAULT_ROLE_NAME};
pub use settings::{Settings, SettingsFile, SettingsStore, DEFAULT_BASE_URL, HTTP_TIMEOUT};

/// Persistence for user-defined roles.
///
/// Built-in roles are never stored; implementations only see custom ones.
pub trait RoleStore: Send + Sync {
    /// Load all custom roles in saved order.
    ///
    /// A store that has never been written holds no roles.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read or parsed.
    fn load_custom(&self) -> Result<Vec<RolePreset>>;

    /// Replace the saved custom roles with `roles`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save_custom(&self, roles: &[RolePreset]) -> Result<()>;
}
