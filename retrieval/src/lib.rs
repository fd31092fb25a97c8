//! # Retrieval Engine
//!
//! This crate turns plain text into a persisted, queryable vector index:
//!
//! - **Chunker**: Overlapping word windows over the source text
//! - **Store**: Paired chunk list and index artifacts on disk
//! - **Retriever**: Build, persist, load, and rank chunks by squared L2 distance
//! - **Agent**: Text and file indexing plus plain-text queries through one provider
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          RagAgent                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │   Chunker    │  │  Embedding   │  │  FlatIndex   │           │
//! │  │              │  │   Provider   │  │  (exact L2)  │           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! │         │                │                  │                   │
//! │         └────────────────┼──────────────────┘                   │
//! │                          ▼                                      │
//! │                  ┌──────────────┐                               │
//! │                  │  Retriever   │                               │
//! │                  └──────────────┘                               │
//! │                          │                                      │
//! │                          ▼                                      │
//! │                  ┌──────────────┐                               │
//! │                  │  IndexStore  │  chunks.json + index.bin      │
//! │                  └──────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use adjacent_retrieval::{HashingProvider, RagAgent, Retriever, RetrieverConfig};
//!
//! let retriever = Retriever::new(RetrieverConfig::new("/tmp/rag"))?;
//! let agent = RagAgent::new(retriever, Arc::new(HashingProvider::new()));
//!
//! agent.index_text("Release is blocked on staging access.").await?;
//! let results = agent.retrieve("What are the deployment blockers?", 1).await?;
//! ```

pub mod agent;
pub mod chunker;
pub mod config;
pub mod engine;
pub mod error;
pub mod store;

pub use agent::{RagAgent, provider_from_config};
pub use chunker::{Chunk, ChunkingConfig, chunk_text};
pub use config::{EmbeddingConfig, EmbeddingProviderType, RetrieverConfig};
pub use engine::{IndexSummary, RetrievalResult, Retriever, RetrieverBuilder, RetrieverStats};
pub use error::{Result, RetrievalError};
pub use store::IndexStore;

// Re-export from dependencies for convenience
pub use adjacent_embeddings::{
    Embedding, EmbeddingError, EmbeddingProvider, HashingProvider, OpenAIProvider,
};
