//! Role presets.
//!
//! A role is a named system prompt. Four roles are built in; users can add
//! their own, which are kept in a separate TOML file and listed after the
//! built-in ones.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::RoleStore;

/// Name of the role used when none is configured.
pub const DEFAULT_ROLE_NAME: &str = "Virtual Assistant";

const BUILTIN_ROLES: [(&str, &str); 4] = [
    (
        DEFAULT_ROLE_NAME,
        "You are a friendly virtual assistant. You are helpful, concise, and provide clear answers.",
    ),
    (
        "Marketing Expert",
        "You are a marketing expert with deep knowledge of digital marketing, branding, consumer psychology, and growth strategies. Provide actionable insights and data-driven recommendations.",
    ),
    (
        "Code Reviewer",
        "You are a senior code reviewer with expertise in software best practices, design patterns, and clean code principles. Focus on code quality, maintainability, security, and performance improvements.",
    ),
    (
        "Technical Writer",
        "You are a technical writer skilled at explaining complex concepts in simple terms. You create clear documentation, tutorials, and guides that are easy to understand for various audiences.",
    ),
];

/// A named system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePreset {
    /// Display name, unique across all roles.
    pub name: String,
    /// System prompt sent at the start of a conversation.
    pub prompt: String,
    /// Whether the role ships with sai.
    #[serde(skip)]
    pub builtin: bool,
}

impl RolePreset {
    /// Create a user-defined role.
    pub fn custom(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            builtin: false,
        }
    }
}

/// The built-in roles, default first.
#[must_use]
pub fn builtin_roles() -> Vec<RolePreset> {
    BUILTIN_ROLES
        .iter()
        .map(|(name, prompt)| RolePreset {
            name: (*name).to_string(),
            prompt: (*prompt).to_string(),
            builtin: true,
        })
        .collect()
}

/// Built-in and custom roles over a [`RoleStore`].
#[derive(Debug)]
pub struct RoleCatalog<S> {
    store: S,
    builtin: Vec<RolePreset>,
    custom: Vec<RolePreset>,
}

impl<S: RoleStore> RoleCatalog<S> {
    /// Load the custom roles from `store`.
    ///
    /// Custom roles that reuse a built-in name are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(store: S) -> Result<Self> {
        let builtin = builtin_roles();
        let mut custom = store.load_custom()?;
        custom.retain(|role| {
            let shadowed = builtin.iter().any(|b| b.name == role.name);
            if shadowed {
                debug!(role = %role.name, "ignoring custom role with a built-in name");
            }
            !shadowed
        });
        for role in &mut custom {
            role.builtin = false;
        }

        Ok(Self {
            store,
            builtin,
            custom,
        })
    }

    /// All roles: built-in first, then custom in file order.
    pub fn all(&self) -> impl Iterator<Item = &RolePreset> {
        self.builtin.iter().chain(self.custom.iter())
    }

    /// Names of all roles, in [`all`](Self::all) order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.all().map(|role| role.name.clone()).collect()
    }

    /// Look up a role by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RolePreset> {
        self.all().find(|role| role.name == name)
    }

    /// The default role.
    #[must_use]
    pub fn default_role(&self) -> &RolePreset {
        &self.builtin[0]
    }

    /// The role named `name`, or the default role if there is none.
    #[must_use]
    pub fn get_or_default(&self, name: &str) -> &RolePreset {
        self.get(name).unwrap_or_else(|| self.default_role())
    }

    /// User-defined roles only.
    #[must_use]
    pub fn custom(&self) -> &[RolePreset] {
        &self.custom
    }

    /// Add and persist a custom role.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidRole`] if the name or prompt is blank
    /// - [`StoreError::RoleExists`] if any role already has this name
    /// - storage errors from saving
    pub fn add(&mut self, name: &str, prompt: &str) -> Result<&RolePreset> {
        let name = name.trim();
        let prompt = prompt.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidRole("name must not be empty".into()));
        }
        if prompt.is_empty() {
            return Err(StoreError::InvalidRole("prompt must not be empty".into()));
        }
        if self.get(name).is_some() {
            return Err(StoreError::RoleExists(name.to_string()));
        }

        let mut custom = self.custom.clone();
        custom.push(RolePreset::custom(name, prompt));
        self.store.save_custom(&custom)?;
        self.custom = custom;

        info!(role = name, "custom role added");
        Ok(&self.custom[self.custom.len() - 1])
    }

    /// Delete and persist the removal of a custom role.
    ///
    /// # Errors
    ///
    /// - [`StoreError::BuiltinRole`] for a built-in role
    /// - [`StoreError::RoleNotFound`] if no custom role has this name
    /// - storage errors from saving
    pub fn delete(&mut self, name: &str) -> Result<RolePreset> {
        if self.builtin.iter().any(|role| role.name == name) {
            return Err(StoreError::BuiltinRole(name.to_string()));
        }
        let index = self
            .custom
            .iter()
            .position(|role| role.name == name)
            .ok_or_else(|| StoreError::RoleNotFound(name.to_string()))?;

        let mut custom = self.custom.clone();
        let removed = custom.remove(index);
        self.store.save_custom(&custom)?;
        self.custom = custom;

        info!(role = name, "custom role deleted");
        Ok(removed)
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
