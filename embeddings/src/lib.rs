//! # Embeddings
//!
//! This crate provides embedding generation and exact nearest-neighbor
//! search for the Adjacent retrieval subsystem.
//!
//! ## Features
//!
//! - **Embedding Providers**: Turn a batch of texts into equal-length vectors
//! - **Exact Index**: Brute-force squared-L2 search with deterministic ties
//! - **Binary Codec**: Checksummed on-disk representation of the index
//! - **Backend Probing**: Capability checks before an index is built
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► VectorIndexBackend         │
//! │       │                                   │                     │
//! │       ▼                                   ▼                     │
//! │  OpenAI/Hashing                  FlatIndex ──► encode/decode    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod hashing;
pub mod index;
pub mod provider;
pub mod similarity;

pub use backend::{ExactL2Backend, VectorIndexBackend, ensure_available};
pub use error::{EmbeddingError, Result};
pub use hashing::HashingProvider;
pub use index::{FlatIndex, LINK_LEN};
pub use provider::{EmbeddingProvider, OPENAI_API_KEY_ENV, OpenAIProvider, validate_batch};
pub use similarity::{Neighbor, squared_l2_distance};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension produced by the default local provider (matches MiniLM-sized models).
pub const DEFAULT_DIMENSION: usize = 384;
