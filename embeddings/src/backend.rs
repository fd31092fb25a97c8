//! Index backends.
//!
//! A backend is checked for availability before it is asked to build, so a
//! missing native component surfaces as [`EmbeddingError::DependencyUnavailable`]
//! instead of failing somewhere inside the build.

use tracing::debug;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::index::FlatIndex;

/// Trait for nearest-neighbor index backends.
pub trait VectorIndexBackend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Check if the backend can run in this process.
    fn is_available(&self) -> bool;

    /// Build an exact index over the given embedding matrix.
    fn build(&self, embeddings: &[Embedding]) -> Result<FlatIndex>;
}

/// Fail with `DependencyUnavailable` unless `backend` reports itself usable.
pub fn ensure_available(backend: &dyn VectorIndexBackend) -> Result<()> {
    if backend.is_available() {
        debug!("Index backend {} is available", backend.name());
        Ok(())
    } else {
        Err(EmbeddingError::DependencyUnavailable(format!(
            "index backend `{}`",
            backend.name()
        )))
    }
}

/// Pure-Rust brute-force squared-L2 backend. Always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactL2Backend;

impl VectorIndexBackend for ExactL2Backend {
    fn name(&self) -> &str {
        "exact-l2"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn build(&self, embeddings: &[Embedding]) -> Result<FlatIndex> {
        FlatIndex::build(embeddings)
    }
}
