//! Streaming response decoder.
//!
//! Each line of a chat reply is classified as reasoning or answer text and
//! folded into one growing Markdown buffer. A marker is inserted whenever
//! the model starts thinking, and a horizontal rule separates the
//! reasoning from the answer that follows it.
//!
//! ```
//! use sai_client::decoder::{StreamDecoder, SECTION_BREAK, THINKING_MARKER};
//!
//! let mut decoder = StreamDecoder::new();
//! decoder.fold(r#"{"message":{"thinking":"A"}}"#).unwrap();
//! decoder.fold(r#"{"message":{"content":"B"}}"#).unwrap();
//!
//! assert_eq!(
//!     decoder.buffer(),
//!     format!("{THINKING_MARKER}A{SECTION_BREAK}B")
//! );
//! ```

use futures::stream::{self, Stream, StreamExt};

use crate::error::{ChatError, OllamaError, Result};
use crate::types::ChatChunk;

/// Banner inserted before reasoning text.
pub const THINKING_MARKER: &str = "THINKING 🤔: ";

/// Inserted between reasoning and the answer (a Markdown rule).
pub const SECTION_BREAK: &str = "\n\n---\n";

/// Appended for a message that carries no text at all.
const PLACEHOLDER: &str = "\n";

// =============================================================================
// Fragments
// =============================================================================

/// One classified line of a chat reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Model reasoning.
    Reasoning(String),
    /// Answer text.
    Content(String),
    /// A message with neither reasoning nor content.
    Placeholder,
}

/// Which side of the reply a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// Reasoning text.
    Reasoning,
    /// Answer text or placeholder.
    Answer,
}

impl Fragment {
    /// Parse and classify one raw line.
    ///
    /// # Errors
    ///
    /// - [`ChatError::Decode`] if the line is not a JSON record.
    /// - [`ChatError::Ollama`] if the record carries `error`, or has no
    ///   `message` object.
    pub fn parse(raw: &str) -> Result<Self> {
        let chunk: ChatChunk =
            serde_json::from_str(raw).map_err(|e| ChatError::decode(raw, e))?;
        Self::from_chunk(chunk, raw)
    }

    fn from_chunk(chunk: ChatChunk, raw: &str) -> Result<Self> {
        if let Some(error) = chunk.error {
            return Err(OllamaError::new(error).into());
        }
        let Some(message) = chunk.message else {
            return Err(OllamaError::new(format!("No message in response: {raw}")).into());
        };

        Ok(match (message.thinking, message.content) {
            (Some(thinking), _) => Self::Reasoning(thinking),
            (None, Some(content)) => Self::Content(content),
            (None, None) => Self::Placeholder,
        })
    }

    /// The fragment's kind.
    #[must_use]
    pub const fn kind(&self) -> FragmentKind {
        match self {
            Self::Reasoning(_) => FragmentKind::Reasoning,
            Self::Content(_) | Self::Placeholder => FragmentKind::Answer,
        }
    }

    /// Text appended to the buffer for this fragment.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Reasoning(text) | Self::Content(text) => text,
            Self::Placeholder => PLACEHOLDER,
        }
    }
}

// =============================================================================
// State machine
// =============================================================================

/// Decoder state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Nothing received yet.
    #[default]
    Idle,
    /// The last fragment was reasoning.
    Thinking,
    /// The last fragment was answer text.
    Answering,
}

impl Mode {
    /// Transition on a fragment of `kind`.
    ///
    /// Returns the next mode and the marker to append before the fragment's
    /// text, if any.
    #[must_use]
    pub const fn on(self, kind: FragmentKind) -> (Self, Option<&'static str>) {
        match (self, kind) {
            (Self::Thinking, FragmentKind::Reasoning) => (Self::Thinking, None),
            (_, FragmentKind::Reasoning) => (Self::Thinking, Some(THINKING_MARKER)),
            (Self::Thinking, FragmentKind::Answer) => (Self::Answering, Some(SECTION_BREAK)),
            (_, FragmentKind::Answer) => (Self::Answering, None),
        }
    }
}

/// Accumulates one reply.
///
/// A decoder lives for exactly one stream; start a new one per request.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: String,
    mode: Mode,
    fragments: usize,
}

impl StreamDecoder {
    /// Create an idle decoder with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one raw line into the buffer and return the whole buffer.
    ///
    /// # Errors
    ///
    /// See [`Fragment::parse`]. On error the buffer is left untouched, but
    /// the caller is expected to discard the decoder.
    pub fn fold(&mut self, raw: &str) -> Result<&str> {
        let fragment = Fragment::parse(raw)?;
        self.apply(&fragment);
        Ok(&self.buffer)
    }

    /// Fold an already classified fragment.
    pub fn apply(&mut self, fragment: &Fragment) {
        let (next, marker) = self.mode.on(fragment.kind());
        if let Some(marker) = marker {
            self.buffer.push_str(marker);
        }
        self.buffer.push_str(fragment.text());
        self.mode = next;
        self.fragments += 1;
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Current mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of fragments folded.
    #[must_use]
    pub const fn fragments(&self) -> usize {
        self.fragments
    }

    /// Consume the decoder and return its buffer.
    #[must_use]
    pub fn into_buffer(self) -> String {
        self.buffer
    }
}

/// Turn a stream of raw lines into a stream of cumulative snapshots.
///
/// One snapshot is produced per line. The stream ends after the first
/// error, whether it came from the transport or from decoding.
pub fn decode_snapshots<S>(lines: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = Result<String>> + Unpin,
{
    stream::try_unfold(
        (lines, StreamDecoder::new()),
        |(mut lines, mut decoder)| async move {
            let Some(raw) = lines.next().await else {
                return Ok::<_, ChatError>(None);
            };
            let snapshot = decoder.fold(&raw?)?.to_string();
            Ok(Some((snapshot, (lines, decoder))))
        },
    )
}
