//! Newline framing for NDJSON response bodies.
//!
//! HTTP chunk boundaries do not line up with JSON records, so raw bytes are
//! buffered here until a full line is available.

use crate::error::{excerpt, FrameError};

/// Longest line accepted before a newline must arrive.
pub const MAX_LINE_LEN: usize = 1024 * 1024;

/// Splits a byte stream into newline-delimited lines.
#[derive(Debug)]
pub struct LineFramer {
    buf: Vec<u8>,
    /// Bytes of `buf` already known to hold no newline.
    scanned: usize,
    max_line: usize,
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_LEN)
    }
}

impl LineFramer {
    /// Create an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty framer that rejects lines longer than `max_line` bytes.
    #[must_use]
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buf: Vec::new(),
            scanned: 0,
            max_line,
        }
    }

    /// Feed bytes and return every line completed by them.
    ///
    /// Blank lines are skipped and a trailing `\r` is removed. A line that is
    /// not valid UTF-8, or a line growing past the maximum length, yields an
    /// error after the lines before it; nothing after it is returned.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Result<String, FrameError>> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buf[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            let line = self.decode_line(&self.buf[start..end]);
            start = end + 1;
            from = start;
            match line {
                Ok(Some(text)) => lines.push(Ok(text)),
                Ok(None) => {}
                Err(err) => {
                    lines.push(Err(err));
                    break;
                }
            }
        }

        self.buf.drain(..start);
        self.scanned = self.buf.len();
        if self.buf.len() > self.max_line && !lines.iter().any(Result::is_err) {
            lines.push(Err(FrameError::LineTooLong {
                limit: self.max_line,
            }));
        }
        lines
    }

    /// Flush a final line that was not newline-terminated.
    ///
    /// # Errors
    ///
    /// Returns an error if the remaining bytes are not valid UTF-8.
    pub fn finish(&mut self) -> Result<Option<String>, FrameError> {
        let rest = std::mem::take(&mut self.buf);
        self.scanned = 0;
        self.decode_line(&rest)
    }

    /// Whether bytes are waiting for a newline.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    fn decode_line(&self, bytes: &[u8]) -> Result<Option<String>, FrameError> {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        if bytes.len() > self.max_line {
            return Err(FrameError::LineTooLong {
                limit: self.max_line,
            });
        }
        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(Some(text.to_string())),
            Err(source) => Err(FrameError::InvalidUtf8 {
                raw: excerpt(&String::from_utf8_lossy(bytes)),
                source,
            }),
        }
    }
}
