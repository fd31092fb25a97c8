//! Error types for the retrieval subsystem.

use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while chunking, persisting, or querying.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Bad chunking parameters or mismatched inputs.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No text, or text that produced no chunks.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// A stored artifact or input file is missing.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored artifact exists but cannot be trusted.
    #[error("corrupt artifact: {0}")]
    Corrupt(String),

    /// Query attempted with no resident or loadable index.
    #[error("index not built: call index_text or index_chunks first")]
    IndexNotBuilt,

    /// Embedding, index, or provider error.
    #[error("embedding error: {0}")]
    Embedding(#[from] adjacent_embeddings::EmbeddingError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
