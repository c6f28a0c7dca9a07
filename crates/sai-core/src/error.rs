//! Common error types for sai.
//!
//! This module provides shared error types that are used across multiple crates.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the sai client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A message role outside of `system`, `user` and `assistant`.
    #[error("unknown message role: {0}")]
    UnknownRole(String),

    /// A model name that is empty or contains whitespace.
    #[error("invalid model name: {0:?}")]
    InvalidModelName(String),
}
