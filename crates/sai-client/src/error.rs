//! Chat error types.
//!
//! Every failure of a chat turn falls into one of three kinds: the server
//! could not be reached, the server answered with an error (or without a
//! field the protocol requires), or a streamed line was not valid UTF-8 JSON.

use thiserror::Error;

/// A result type using `ChatError`.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Longest raw fragment kept inside a decode error.
const MAX_RAW_EXCERPT: usize = 200;

/// An error reported by the Ollama server itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct OllamaError(String);

impl OllamaError {
    /// Create an error from a server-supplied message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// The server-supplied message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// A streamed line that could not be framed as text.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The line is not valid UTF-8.
    #[error("line is not valid UTF-8 ({source}): {raw}")]
    InvalidUtf8 {
        /// Excerpt of the line with invalid bytes replaced.
        raw: String,
        /// Where decoding stopped.
        source: std::str::Utf8Error,
    },

    /// No newline arrived within the allowed line length.
    #[error("line longer than {limit} bytes")]
    LineTooLong {
        /// The maximum accepted line length.
        limit: usize,
    },
}

/// Coarse classification of a [`ChatError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport unreachable or misconfigured.
    Connection,
    /// The server reported an error or omitted a required field.
    Protocol,
    /// A fragment could not be parsed.
    Decode,
}

impl ErrorKind {
    /// Short label used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Protocol => "protocol",
            Self::Decode => "decode",
        }
    }
}

/// Errors that end a chat turn or an API call.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The server could not be reached, or the connection dropped.
    #[error("cannot reach Ollama at {url}: {message}")]
    Connection {
        /// Endpoint that was being contacted.
        url: String,
        /// What went wrong.
        message: String,
    },

    /// The server answered with an explicit error.
    #[error("Ollama error: {0}")]
    Ollama(#[from] OllamaError),

    /// The stream closed without producing any answer text.
    #[error("the model returned an empty response")]
    EmptyResponse,

    /// A fragment was not the JSON record the protocol requires.
    #[error("malformed response fragment ({source}): {raw}")]
    Decode {
        /// Excerpt of the offending input.
        raw: String,
        /// Parser error.
        source: serde_json::Error,
    },

    /// A streamed line was not valid text.
    #[error("malformed response line: {0}")]
    Frame(#[from] FrameError),
}

impl ChatError {
    /// Create a connection error for `url`.
    pub fn connection(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a decode error, keeping only a short excerpt of `raw`.
    #[must_use]
    pub fn decode(raw: &str, source: serde_json::Error) -> Self {
        Self::Decode {
            raw: excerpt(raw),
            source,
        }
    }

    /// The kind of failure.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Ollama(_) | Self::EmptyResponse => ErrorKind::Protocol,
            Self::Decode { .. } | Self::Frame(_) => ErrorKind::Decode,
        }
    }

    /// A hint telling the user what to do next.
    #[must_use]
    pub const fn remediation(&self) -> &'static str {
        match self {
            Self::Connection { .. } => {
                "Make sure Ollama is running (`ollama serve`) and reachable, or change the URL with /setup."
            }
            Self::Ollama(_) => "Check that the selected model is installed with /model.",
            Self::EmptyResponse => "Send the message again or pick another model with /model.",
            Self::Decode { .. } | Self::Frame(_) => {
                "The server sent data this client does not understand. Check that the URL points to an Ollama server."
            }
        }
    }
}

/// Keep at most a short prefix of `raw` for error messages.
pub(crate) fn excerpt(raw: &str) -> String {
    match raw.char_indices().nth(MAX_RAW_EXCERPT) {
        Some((idx, _)) => format!("{}…", &raw[..idx]),
        None => raw.to_string(),
    }
}

/// Describe a reqwest failure without the noise of its debug form.
pub(crate) fn describe_reqwest(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "the request timed out".to_string()
    } else if err.is_connect() {
        "connection refused or host unreachable".to_string()
    } else if err.is_builder() {
        format!("invalid request: {err}")
    } else {
        err.to_string()
    }
}
