//! Configuration for the retriever.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chunker::ChunkingConfig;
use crate::error::{Result, RetrievalError};

/// Configuration for a [`crate::Retriever`] and the agent built on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrieverConfig {
    /// Directory holding the chunk list and index artifacts.
    pub storage_dir: PathBuf,

    /// Chunking parameters used by `index_text`.
    pub chunking: ChunkingConfig,

    /// Number of results returned when the caller does not ask for a count.
    pub default_top_k: usize,

    /// Embedding provider configuration.
    pub embedding: EmbeddingConfig,
}

impl RetrieverConfig {
    /// Create a new configuration with default values.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            chunking: ChunkingConfig::default(),
            default_top_k: 5,
            embedding: EmbeddingConfig::default(),
        }
    }

    /// Set the storage directory.
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// Set the chunking parameters.
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    /// Set the default number of results.
    pub fn with_default_top_k(mut self, top_k: usize) -> Self {
        self.default_top_k = top_k;
        self
    }

    /// Check the configuration for values that would fail later.
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        if self.embedding.dimensions == Some(0) {
            return Err(RetrievalError::Config(
                "embedding.dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| RetrievalError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RetrievalError::NotFound(format!("config file {}", path.display()))
            } else {
                RetrievalError::Io(e)
            }
        })?;
        Self::from_toml_str(&content)
    }
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self::new(dirs::data_dir().unwrap_or_default().join("adjacent/rag"))
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model to use for embeddings (provider default when unset).
    pub model: Option<String>,

    /// Output dimension (provider default when unset).
    pub dimensions: Option<usize>,

    /// API base URL override for HTTP providers.
    pub base_url: Option<String>,

    /// API key for HTTP providers. Never written back out.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Environment variable holding the API key when `api_key` is unset
    /// (`OPENAI_API_KEY` when this is unset too).
    pub api_key_env: Option<String>,
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// OpenAI embeddings API.
    #[serde(rename = "openai")]
    OpenAI,
    /// Local feature-hashing embeddings.
    #[default]
    Hashing,
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "hashing" => Ok(Self::Hashing),
            other => Err(RetrievalError::Config(format!(
                "unknown embedding provider: {other}"
            ))),
        }
    }
}
