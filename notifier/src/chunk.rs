//! Splitting diffs into transport-sized messages.

use serde::{Deserialize, Serialize};

/// Default maximum chunk size, in UTF-16 code units.
pub const DEFAULT_MAX_CHUNK: usize = 4000;

/// Length of `text` as Telegram counts it: UTF-16 code units.
///
/// Characters outside the Basic Multilingual Plane (most emoji) count twice.
pub fn message_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Ordered message chunks derived from one diff.
///
/// Concatenating [`chunks`](Self::chunks) in order reproduces the source text
/// exactly, and no chunk is longer than the maximum it was built with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationBatch {
    /// Chunks in delivery order.
    pub chunks: Vec<String>,

    /// Maximum chunk length, see [`message_len`].
    pub max_chunk: usize,
}

impl NotificationBatch {
    /// Split `text` into chunks of at most `max_chunk` units as measured by
    /// [`message_len`].
    ///
    /// Text that already fits becomes a single chunk. Longer text is cut at
    /// the last line boundary that keeps the chunk within the limit. A line
    /// that is itself longer than the limit is the one exception to never
    /// splitting a line: it is cut at the limit, never inside a character.
    ///
    /// Empty text yields an empty batch.
    pub fn from_text(text: &str, max_chunk: usize) -> Self {
        let max_chunk = max_chunk.max(1);
        let mut chunks = Vec::new();

        if text.is_empty() {
            return Self { chunks, max_chunk };
        }

        if message_len(text) <= max_chunk {
            chunks.push(text.to_string());
            return Self { chunks, max_chunk };
        }

        let mut current = String::new();
        let mut current_len = 0;

        for line in text.split_inclusive('\n') {
            let line_len = message_len(line);

            if current_len + line_len <= max_chunk {
                current.push_str(line);
                current_len += line_len;
                continue;
            }

            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }

            if line_len <= max_chunk {
                current.push_str(line);
                current_len = line_len;
                continue;
            }

            // Overlong line: emit full-size pieces, carry the tail forward.
            let mut piece = String::new();
            let mut piece_len = 0;
            for ch in line.chars() {
                let width = ch.len_utf16();
                if !piece.is_empty() && piece_len + width > max_chunk {
                    chunks.push(std::mem::take(&mut piece));
                    piece_len = 0;
                }
                piece.push(ch);
                piece_len += width;
            }
            current = piece;
            current_len = piece_len;
        }

        if !current.is_empty() {
            chunks.push(current);
        }

        Self { chunks, max_chunk }
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// True when there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Iterate over the chunks in delivery order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(String::as_str)
    }
}
