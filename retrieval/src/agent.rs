//! High-level RAG agent.
//!
//! `RagAgent` pairs a [`Retriever`] with one embedding provider so callers can
//! index raw text or files and retrieve with a plain-text query. The provider
//! is injected at construction and lives as long as the agent; the same
//! instance embeds both chunks and queries, which keeps their dimensions
//! consistent.

use std::path::Path;
use std::sync::Arc;

use adjacent_embeddings::{
    EmbeddingError, EmbeddingProvider, HashingProvider, OPENAI_API_KEY_ENV, OpenAIProvider,
};
use tracing::{debug, info};

use crate::config::{EmbeddingConfig, EmbeddingProviderType, RetrieverConfig};
use crate::engine::{IndexSummary, RetrievalResult, Retriever};
use crate::error::{Result, RetrievalError};

/// Build the provider described by `config`.
///
/// Fails with `DependencyUnavailable` when the provider cannot run, for
/// example when the OpenAI provider has no API key.
pub fn provider_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingProviderType::OpenAI => {
            let key_env = config.api_key_env.as_deref().unwrap_or(OPENAI_API_KEY_ENV);
            let mut provider = OpenAIProvider::from_env_var(key_env);
            if let Some(key) = &config.api_key {
                provider = provider.with_api_key(key);
            }
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            if let Some(dims) = config.dimensions {
                provider = provider.with_dimensions(dims);
            }
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        EmbeddingProviderType::Hashing => match config.dimensions {
            Some(dims) => Arc::new(HashingProvider::with_dimension(dims)?),
            None => Arc::new(HashingProvider::new()),
        },
    };

    if !provider.is_available() {
        return Err(EmbeddingError::DependencyUnavailable(format!(
            "embedding provider `{}`",
            provider.name()
        ))
        .into());
    }

    info!(
        "Using embedding provider {} ({}, dimension {})",
        provider.name(),
        provider.model(),
        provider.dimension()
    );
    Ok(provider)
}

/// Agent that wires an embedding provider to a retriever.
pub struct RagAgent {
    retriever: Retriever,
    provider: Arc<dyn EmbeddingProvider>,
}

impl RagAgent {
    /// Create an agent from an existing retriever and provider.
    pub fn new(retriever: Retriever, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            retriever,
            provider,
        }
    }

    /// Create an agent with the retriever and provider described by `config`.
    pub fn from_config(config: RetrieverConfig) -> Result<Self> {
        let provider = provider_from_config(&config.embedding)?;
        let retriever = Retriever::new(config)?;
        Ok(Self::new(retriever, provider))
    }

    /// The underlying retriever.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// The embedding provider.
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Chunk, embed, index, and persist `text`.
    pub async fn index_text(&self, text: &str) -> Result<IndexSummary> {
        if text.trim().is_empty() {
            return Err(RetrievalError::EmptyInput("text must not be empty".to_string()));
        }
        self.retriever.index_text(text, self.provider.as_ref()).await
    }

    /// Read `paths`, join their contents with blank lines, and index the result.
    ///
    /// Every file is read before anything is indexed; a missing file fails
    /// with `NotFound`.
    pub async fn index_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<IndexSummary> {
        let mut texts = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RetrievalError::NotFound(path.display().to_string())
                } else {
                    RetrievalError::Io(e)
                }
            })?;
            debug!("Read {} bytes from {}", text.len(), path.display());
            texts.push(text);
        }

        self.index_text(&texts.join("\n\n")).await
    }

    /// Return the `top_k` chunks most similar to `query`.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyInput("query must not be empty".to_string()));
        }
        let embedding = self.provider.embed(query).await?;
        self.retriever.query(&embedding, top_k).await
    }

    /// Retrieve with the configured default result count.
    pub async fn retrieve_default(&self, query: &str) -> Result<Vec<RetrievalResult>> {
        let top_k = self.retriever.config().default_top_k;
        self.retrieve(query, top_k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::ChunkingConfig;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn agent(dir: &TempDir) -> RagAgent {
        let config = RetrieverConfig::new(dir.path()).with_chunking(ChunkingConfig::new(6, 2));
        let retriever = Retriever::new(config).unwrap();
        RagAgent::new(retriever, Arc::new(HashingProvider::new()))
    }

    #[tokio::test]
    async fn test_blank_inputs_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let agent = agent(&temp_dir);

        assert!(matches!(
            agent.index_text("  \n").await,
            Err(RetrievalError::EmptyInput(_))
        ));
        assert!(matches!(
            agent.retrieve("", 3).await,
            Err(RetrievalError::EmptyInput(_))
        ));
    }

    #[tokio::test]
    async fn test_retrieve_before_index_is_not_built() {
        let temp_dir = TempDir::new().unwrap();
        let agent = agent(&temp_dir);
        assert!(matches!(
            agent.retrieve("anything", 3).await,
            Err(RetrievalError::IndexNotBuilt)
        ));
    }

    #[tokio::test]
    async fn test_index_files_concatenates_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first.txt");
        let second = temp_dir.path().join("second.txt");
        tokio::fs::write(&first, "alpha beta").await.unwrap();
        tokio::fs::write(&second, "gamma delta").await.unwrap();

        let agent = agent(&temp_dir);
        let summary = agent.index_files(&[&first, &second]).await.unwrap();
        assert_eq!(summary.chunks, 1);
        assert_eq!(
            agent.retriever().chunks().await,
            Some(vec!["alpha beta gamma delta".to_string()])
        );
    }

    #[tokio::test]
    async fn test_index_files_missing_path() {
        let temp_dir = TempDir::new().unwrap();
        let agent = agent(&temp_dir);
        let missing = temp_dir.path().join("missing.txt");

        let err = agent.index_files(&[missing]).await.unwrap_err();
        assert!(matches!(err, RetrievalError::NotFound(_)));
        assert!(!agent.retriever().store().exists().await);
    }

    #[tokio::test]
    async fn test_retrieve_default_uses_configured_top_k() {
        let temp_dir = TempDir::new().unwrap();
        let config = RetrieverConfig::new(temp_dir.path())
            .with_chunking(ChunkingConfig::new(2, 0))
            .with_default_top_k(2);
        let agent = RagAgent::new(
            Retriever::new(config).unwrap(),
            Arc::new(HashingProvider::new()),
        );
        agent.index_text("one two three four five six").await.unwrap();

        let results = agent.retrieve_default("three four").await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk, "three four");
    }

    #[test]
    fn test_provider_from_config_without_key_is_unavailable() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderType::OpenAI,
            api_key_env: Some("ADJACENT_TEST_UNSET_OPENAI_KEY".to_string()),
            ..EmbeddingConfig::default()
        };
        let err = provider_from_config(&config).err().unwrap();
        assert!(matches!(
            err,
            RetrievalError::Embedding(EmbeddingError::DependencyUnavailable(_))
        ));
    }

    #[test]
    fn test_provider_from_config_with_explicit_key() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderType::OpenAI,
            model: Some("text-embedding-3-large".to_string()),
            api_key: Some("test-key".to_string()),
            api_key_env: Some("ADJACENT_TEST_UNSET_OPENAI_KEY".to_string()),
            ..EmbeddingConfig::default()
        };
        let provider = provider_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.model(), "text-embedding-3-large");
    }

    #[test]
    fn test_provider_from_config() {
        let config = EmbeddingConfig {
            dimensions: Some(32),
            ..EmbeddingConfig::default()
        };
        let provider = provider_from_config(&config).unwrap();
        assert_eq!(provider.name(), "hashing");
        assert_eq!(provider.dimension(), 32);
    }
}
