use std::collections::VecDeque;

use crate::error::{LlmError, Result};

/// Longest line accepted before the stream is considered corrupt
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Ring buffer that turns chunked bytes into trimmed text lines.
///
/// Network chunks can split a line, or a multi-byte UTF-8 sequence, anywhere,
/// so bytes are only decoded once the whole line has arrived.
pub struct CircularLineBuffer {
    buffer: VecDeque<u8>,
    // Bytes already known to contain no newline
    scanned: usize,
}

impl CircularLineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            scanned: 0,
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next complete line, without its terminator and surrounding whitespace.
    /// `None` until a newline arrives.
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let Some(offset) = self.buffer.range(self.scanned..).position(|&b| b == b'\n') else {
            self.scanned = self.buffer.len();
            if self.scanned > MAX_LINE_BYTES {
                self.buffer.clear();
                self.scanned = 0;
                return Some(Err(LlmError::Stream(format!(
                    "line exceeds {} bytes",
                    MAX_LINE_BYTES
                ))));
            }
            return None;
        };

        let end = self.scanned + offset;
        self.scanned = 0;
        let line: Vec<u8> = self.buffer.drain(..=end).collect();
        Some(decode(line))
    }

    /// Take whatever is left after the last newline, if anything
    pub fn finish(&mut self) -> Option<Result<String>> {
        self.scanned = 0;
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            self.buffer.clear();
            return None;
        }
        let rest: Vec<u8> = self.buffer.drain(..).collect();
        Some(decode(rest))
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn decode(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map(|line| line.trim().to_string())
        .map_err(|e| LlmError::Stream(format!("Invalid UTF-8: {}", e)))
}
