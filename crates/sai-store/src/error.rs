//! Error types for the storage layer.

use std::path::PathBuf;

use thiserror::Error;

/// A result type using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while loading or saving settings and roles.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No per-user configuration directory exists on this platform.
    #[error("could not determine the configuration directory")]
    NoConfigDir,

    /// A file could not be read or written.
    #[error("cannot access {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A file is not valid TOML for its schema.
    #[error("invalid file {path}: {source}")]
    Parse {
        /// File involved.
        path: PathBuf,
        /// Parser error.
        source: toml::de::Error,
    },

    /// Data could not be written as TOML.
    #[error("serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    /// A role with this name already exists.
    #[error("Role '{0}' already exists")]
    RoleExists(String),

    /// No role with this name exists.
    #[error("Role '{0}' not found")]
    RoleNotFound(String),

    /// Built-in roles cannot be changed.
    #[error("Role '{0}' is built in and cannot be deleted")]
    BuiltinRole(String),

    /// A role name or prompt was blank.
    #[error("invalid role: {0}")]
    InvalidRole(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}
