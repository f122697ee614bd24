//! Oversized Text Chunking
//!
//! The engine refuses lines longer than its buffer (20000 bytes unless
//! configured otherwise). Long `PUSH` text is therefore cut into pieces that
//! each fit in `buffer - CHUNK_MARGIN` bytes and pushed one after another
//! against the same object; the engine accumulates the terms.
//!
//! Sizes are measured in wire bytes: UTF-8 length, with a double quote
//! counted twice since it is sent escaped.

use crate::protocol::codec::wire_len;

/// Default engine buffer size in bytes
pub const DEFAULT_BUFFER: usize = 20000;

/// Bytes reserved for the command frame around the text
pub const CHUNK_MARGIN: usize = 100;

/// Splits `text` into consecutive pieces of at most `buffer - CHUNK_MARGIN`
/// wire bytes.
///
/// Concatenating the pieces gives back `text` exactly. A single character
/// wider than the limit is emitted alone. Empty text yields no pieces.
pub fn chunk_text(text: &str, buffer: usize) -> Chunks<'_> {
    Chunks {
        rest: text,
        limit: buffer.saturating_sub(CHUNK_MARGIN),
    }
}

/// Iterator returned by [`chunk_text`].
#[derive(Debug)]
pub struct Chunks<'a> {
    rest: &'a str,
    limit: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }

        let mut size = 0;
        let mut end = self.rest.len();
        for (idx, c) in self.rest.char_indices() {
            let width = wire_len(c);
            if idx > 0 && size + width > self.limit {
                end = idx;
                break;
            }
            size += width;
        }

        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire_size(s: &str) -> usize {
        s.chars().map(wire_len).sum()
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks: Vec<&str> = chunk_text("hello world", DEFAULT_BUFFER).collect();
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(chunk_text("", DEFAULT_BUFFER).count(), 0);
    }

    #[test]
    fn test_exact_fit() {
        let text = "a".repeat(DEFAULT_BUFFER - CHUNK_MARGIN);
        assert_eq!(chunk_text(&text, DEFAULT_BUFFER).count(), 1);

        let text = "a".repeat(DEFAULT_BUFFER - CHUNK_MARGIN + 1);
        let chunks: Vec<&str> = chunk_text(&text, DEFAULT_BUFFER).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1], "a");
    }

    #[test]
    fn test_reconstructs_and_bounds() {
        let texts = [
            "The quick brown fox jumps over the lazy dog ".repeat(50),
            "żółć gęślą jaźń ".repeat(40),
            "\"quoted\" 🦀 mixed ascii ".repeat(30),
        ];
        for buffer in [101, 105, 117, 160, 400, 1000] {
            for text in &texts {
                let chunks: Vec<&str> = chunk_text(text, buffer).collect();
                assert_eq!(chunks.concat(), *text);
                for chunk in &chunks {
                    let size = wire_size(chunk);
                    assert!(
                        size <= buffer - CHUNK_MARGIN || chunk.chars().count() == 1,
                        "chunk of {} bytes exceeds limit for buffer {}",
                        size,
                        buffer
                    );
                }
            }
        }
    }

    #[test]
    fn test_never_splits_characters() {
        // Each 'ż' is two bytes; an odd limit must not cut one in half.
        let text = "ż".repeat(20);
        let chunks: Vec<&str> = chunk_text(&text, CHUNK_MARGIN + 5).collect();
        assert!(chunks.iter().all(|c| c.len() == 4));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_oversized_character_alone() {
        // Limit of 1 byte: multi-byte characters go out one per chunk.
        let chunks: Vec<&str> = chunk_text("a€b", CHUNK_MARGIN + 1).collect();
        assert_eq!(chunks, vec!["a", "€", "b"]);
    }

    #[test]
    fn test_buffer_smaller_than_margin() {
        let chunks: Vec<&str> = chunk_text("abc", 10).collect();
        assert_eq!(chunks, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_large_ingest_chunk_count() {
        let text = (0..10_000)
            .map(|i| format!("{:08x}-0000-4000-8000-{:012x}", i, i))
            .collect::<Vec<_>>()
            .join(" ");
        let limit = DEFAULT_BUFFER - CHUNK_MARGIN;
        let expected = text.len().div_ceil(limit);
        assert_eq!(chunk_text(&text, DEFAULT_BUFFER).count(), expected);
    }
}
