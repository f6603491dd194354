//! Boundary-aware text chunking
//!
//! Text is cut into windows of `chunk_size` characters that overlap by `overlap`
//! characters. When a window does not reach the end of the text, its end is pulled
//! back to the last sentence or paragraph boundary found in the final 100 characters,
//! so chunks tend to end on whole sentences.

use docrag_core::{Error, Result};

/// How far back from a window's fixed end to look for a boundary
const BOUNDARY_WINDOW: usize = 100;

/// Delimiters a chunk may end on; the chunk keeps the delimiter
const SENTENCE_ENDINGS: [[char; 2]; 4] = [['.', ' '], ['!', ' '], ['?', ' '], ['\n', '\n']];

/// Splits text into ordered, overlapping, trimmed segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker; `overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Configuration(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunks. Blank windows are dropped.
    ///
    /// Offsets count characters, not bytes. The same input always yields the same
    /// sequence.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = start + self.chunk_size;

            if end < len {
                let search_from = start.max(end.saturating_sub(BOUNDARY_WINDOW));
                if let Some(boundary) = last_boundary(&chars, search_from, end) {
                    // The next window must start after this one did.
                    if boundary > start + self.overlap {
                        end = boundary;
                    }
                }
            }

            let window: String = chars[start..end.min(len)].iter().collect();
            let trimmed = window.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }

            if end >= len {
                break;
            }
            start = end - self.overlap;
        }

        chunks
    }
}

/// Position just past the last delimiter starting in `from..to`
fn last_boundary(chars: &[char], from: usize, to: usize) -> Option<usize> {
    let mut best = None;
    for i in from..to {
        let rest = &chars[i..];
        for ending in &SENTENCE_ENDINGS {
            if rest.starts_with(ending) {
                best = Some(i + ending.len());
            }
        }
    }
    best
}

/// Chunk `text` with a one-off chunker
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(TextChunker::new(chunk_size, overlap)?.chunk(text))
}
