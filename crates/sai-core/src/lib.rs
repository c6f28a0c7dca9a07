//! Core types for the sai chat client.
//!
//! This crate provides the foundational types shared by the transport, the
//! storage layer and the terminal front end:
//!
//! - **Messages**: role-tagged conversation turns and the ordered history
//! - **Model names**: validated identifiers for models served by Ollama
//! - **Error types**: common error definitions shared across crates
//!
//! # Example
//!
//! ```
//! use sai_core::{Conversation, Message, ModelName};
//!
//! let model = ModelName::new("llama3.2").unwrap();
//!
//! let mut history = Conversation::with_system_prompt("Answer briefly.");
//! history.push(Message::user("Hello"));
//!
//! assert_eq!(history.len(), 2);
//! assert_eq!(model.as_str(), "llama3.2");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod message;
pub mod model;

pub use error::{CoreError, Result};
pub use message::{Conversation, Message, MessageRole};
pub use model::ModelName;
