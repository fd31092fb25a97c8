//! Deterministic lexical embeddings.
//!
//! `HashingProvider` uses the signed feature-hashing trick. Each lowercase
//! alphanumeric token is hashed with SHA-256 into one of `dimension` buckets
//! with a ±1 sign, and the resulting vector is L2-normalized. Texts that share
//! vocabulary land close together in squared-L2 space. The provider needs no
//! model files or network, so it works offline and in tests.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{EmbeddingError, Result};
use crate::provider::EmbeddingProvider;
use crate::similarity::normalize;
use crate::{DEFAULT_DIMENSION, Embedding};

/// Feature-hashing embedding provider.
#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    /// Create a provider with the default dimension.
    pub fn new() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }

    /// Create a provider producing vectors of `dimension` values.
    pub fn with_dimension(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidArgument(
                "hashing dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    /// Embed a single text synchronously.
    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut embedding = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }
        normalize(&mut embedding);
        embedding
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        "sha256-feature-hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        debug!(
            "Hashing {} texts into {} dimensions",
            texts.len(),
            self.dimension
        );
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
