//! Ollama chat client for sai.
//!
//! This crate talks to a local Ollama server and turns its streamed replies
//! into live terminal output:
//!
//! - **Client**: [`OllamaClient`] lists and preloads models and opens
//!   streaming chat requests, behind the [`ChatTransport`] trait
//! - **Decoder**: [`StreamDecoder`] folds NDJSON fragments into one Markdown
//!   buffer, marking where reasoning starts and where the answer begins
//! - **Session**: [`ResponseSession`] drives one turn into a [`LiveView`]
//!   and records the reply in the conversation on success
//!
//! # Example
//!
//! ```no_run
//! use sai_client::{OllamaClient, DEFAULT_TIMEOUT};
//!
//! # async fn example() -> sai_client::Result<()> {
//! let client = OllamaClient::new("http://localhost:11434", DEFAULT_TIMEOUT)?;
//! for model in client.list_models().await? {
//!     println!("{model}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod decoder;
pub mod error;
pub mod framing;
pub mod session;
pub mod types;
pub mod view;

pub use client::{ChatTransport, ChunkStream, OllamaClient, DEFAULT_TIMEOUT};
pub use decoder::{decode_snapshots, Fragment, Mode, StreamDecoder};
pub use error::{ChatError, ErrorKind, FrameError, OllamaError, Result};
pub use session::{ResponseSession, TurnOutcome};
pub use types::ChatRequest;
pub use view::LiveView;
