//! Word-window text chunking.
//!
//! Text is split on whitespace into words. Windows of `chunk_size` words are
//! taken starting at offset 0 and advancing by `chunk_size - overlap`, and each
//! window is re-joined with single spaces. Chunking stops at the first window
//! that reaches the last word, so there is never an empty or duplicated
//! trailing chunk.
//!
//! Boundaries are counted in words, never bytes, so multi-byte text splits the
//! same way as ASCII text.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, RetrievalError};

/// Default number of words per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Default number of words shared by consecutive chunks.
pub const DEFAULT_OVERLAP: usize = 100;

/// One chunk of a source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0-based order within the source text; also the chunk's index row.
    pub position: usize,

    /// Space-joined words of the window.
    pub text: String,
}

/// Chunking parameters.
///
/// When deserialized without an `overlap`, the overlap is derived from the
/// chunk size with [`ChunkingConfig::default_overlap`], so setting only a small
/// `chunk_size` still yields a valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawChunkingConfig")]
pub struct ChunkingConfig {
    /// Words per chunk.
    pub chunk_size: usize,

    /// Words repeated at the start of the next chunk.
    pub overlap: usize,
}

impl ChunkingConfig {
    /// Create a chunking configuration.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Overlap used when only `chunk_size` is given: one eighth of the chunk,
    /// capped at [`DEFAULT_OVERLAP`].
    pub fn default_overlap(chunk_size: usize) -> usize {
        (chunk_size / 8).min(DEFAULT_OVERLAP)
    }

    /// Reject `chunk_size == 0` and `overlap >= chunk_size`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RetrievalError::InvalidArgument(
                "chunk_size must be > 0".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(RetrievalError::InvalidArgument(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Split `text` into chunks with these parameters.
    pub fn split(&self, text: &str) -> Result<Vec<Chunk>> {
        chunk_text(text, self.chunk_size, self.overlap)
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP)
    }
}

#[derive(Deserialize)]
struct RawChunkingConfig {
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    overlap: Option<usize>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl From<RawChunkingConfig> for ChunkingConfig {
    fn from(raw: RawChunkingConfig) -> Self {
        let overlap = raw
            .overlap
            .unwrap_or_else(|| Self::default_overlap(raw.chunk_size));
        Self::new(raw.chunk_size, overlap)
    }
}

/// Split text into overlapping word windows.
///
/// Parameters are validated before anything else, so invalid parameters fail
/// even for empty text. Empty or whitespace-only text yields no chunks.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    ChunkingConfig::new(chunk_size, overlap).validate()?;

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(words.len());
        chunks.push(Chunk {
            position: chunks.len(),
            text: words[start..end].join(" "),
        });
        if end == words.len() {
            break;
        }
        start += step;
    }

    debug!(
        "Chunked {} words into {} chunks (size={chunk_size}, overlap={overlap})",
        words.len(),
        chunks.len()
    );
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_overlapping_windows() {
        let chunks = chunk_text("a b c d e f g", 3, 1).unwrap();
        assert_eq!(texts(&chunks), vec!["a b c", "c d e", "e f g"]);
        let positions: Vec<usize> = chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_short_tail_window() {
        let chunks = chunk_text("a b c d e", 3, 1).unwrap();
        assert_eq!(texts(&chunks), vec!["a b c", "c d e"]);

        let chunks = chunk_text("a b c d", 3, 1).unwrap();
        assert_eq!(texts(&chunks), vec!["a b c", "c d"]);
    }

    #[test]
    fn test_text_shorter_than_window() {
        let chunks = chunk_text("only three words", 800, 100).unwrap();
        assert_eq!(texts(&chunks), vec!["only three words"]);
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let chunks = chunk_text("  alpha\t\tbeta\n\ngamma  ", 10, 0).unwrap();
        assert_eq!(texts(&chunks), vec!["alpha beta gamma"]);
    }

    #[test]
    fn test_multibyte_words_count_as_words() {
        let chunks = chunk_text("héllo wörld 日本語 テキスト", 2, 0).unwrap();
        assert_eq!(texts(&chunks), vec!["héllo wörld", "日本語 テキスト"]);
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 3, 1).unwrap().is_empty());
        assert!(chunk_text(" \n\t ", 3, 1).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            chunk_text("a b c", 0, 0),
            Err(RetrievalError::InvalidArgument(_))
        ));
        assert!(matches!(
            chunk_text("a b c", 3, 3),
            Err(RetrievalError::InvalidArgument(_))
        ));
        assert!(matches!(
            chunk_text("", 2, 5),
            Err(RetrievalError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_omitted_overlap_follows_chunk_size() {
        let config: ChunkingConfig = serde_json::from_str(r#"{"chunk_size": 50}"#).unwrap();
        assert_eq!(config, ChunkingConfig::new(50, 6));
        assert!(config.validate().is_ok());

        let config: ChunkingConfig = serde_json::from_str(r#"{"chunk_size": 3}"#).unwrap();
        assert_eq!(config, ChunkingConfig::new(3, 0));

        let config: ChunkingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ChunkingConfig::default());

        let config: ChunkingConfig =
            serde_json::from_str(r#"{"chunk_size": 50, "overlap": 49}"#).unwrap();
        assert_eq!(config, ChunkingConfig::new(50, 49));
    }

    #[test]
    fn test_default_config() {
        let config = ChunkingConfig::default();
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.overlap, 100);
        assert!(config.validate().is_ok());
    }

    mod proptest_chunker {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn windows_cover_every_word(
                words in proptest::collection::vec("[a-zA-Z0-9]{1,8}", 0..200),
                chunk_size in 1usize..40,
                overlap_seed in 0usize..40,
            ) {
                let overlap = overlap_seed % chunk_size;
                let text = words.join(" ");
                let chunks = chunk_text(&text, chunk_size, overlap).unwrap();
                let step = chunk_size - overlap;

                if words.is_empty() {
                    prop_assert!(chunks.is_empty());
                } else {
                    for (i, chunk) in chunks.iter().enumerate() {
                        let start = i * step;
                        let end = (start + chunk_size).min(words.len());
                        prop_assert_eq!(chunk.position, i);
                        prop_assert_eq!(&chunk.text, &words[start..end].join(" "));
                    }
                    let last_start = (chunks.len() - 1) * step;
                    prop_assert!(last_start + chunk_size >= words.len());
                    if chunks.len() > 1 {
                        prop_assert!(last_start - step + chunk_size < words.len());
                    }
                }
            }

            #[test]
            fn chunking_is_deterministic(
                text in "\\PC{0,400}",
                chunk_size in 1usize..20,
                overlap_seed in 0usize..20,
            ) {
                let overlap = overlap_seed % chunk_size;
                let first = chunk_text(&text, chunk_size, overlap).unwrap();
                let second = chunk_text(&text, chunk_size, overlap).unwrap();
                prop_assert_eq!(&first, &second);
                for chunk in &first {
                    prop_assert!(chunk.text.split_whitespace().count() <= chunk_size);
                }
            }

            #[test]
            fn invalid_overlap_always_fails(
                text in "\\PC{0,100}",
                chunk_size in 0usize..20,
                extra in 0usize..20,
            ) {
                let result = chunk_text(&text, chunk_size, chunk_size + extra);
                prop_assert!(matches!(result, Err(RetrievalError::InvalidArgument(_))));
            }
        }
    }
}
