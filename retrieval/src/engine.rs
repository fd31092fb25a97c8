//! Retriever implementation.

use std::path::PathBuf;
use std::sync::Arc;

use adjacent_embeddings::{
    Embedding, EmbeddingProvider, ExactL2Backend, FlatIndex, VectorIndexBackend, ensure_available,
    validate_batch,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::chunker::ChunkingConfig;
use crate::config::RetrieverConfig;
use crate::error::{Result, RetrievalError};
use crate::store::IndexStore;

/// One ranked hit: the chunk text and its squared L2 distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Position of the chunk in the indexed sequence.
    pub position: usize,

    /// Chunk text.
    pub chunk: String,

    /// Squared euclidean distance; lower is more similar.
    pub distance: f32,
}

/// Shape of a freshly built or loaded index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSummary {
    /// Number of indexed chunks.
    pub chunks: usize,

    /// Embedding dimension.
    pub dimension: usize,
}

/// Chunk texts and their index, co-indexed by position. Immutable once built.
#[derive(Debug)]
struct ResidentIndex {
    index: FlatIndex,
    chunks: Vec<String>,
}

impl ResidentIndex {
    fn summary(&self) -> IndexSummary {
        IndexSummary {
            chunks: self.chunks.len(),
            dimension: self.index.dimension(),
        }
    }
}

/// Builds, persists, and queries a vector index over chunked text.
///
/// A retriever starts *unbuilt*. It becomes *built* after `index_text`,
/// `index_chunks`, or a successful `load`; a query against an unbuilt
/// retriever loads from storage first. Rebuilding replaces both the resident
/// index and the stored artifacts, and only after the new artifacts are saved.
///
/// Queries share the resident index through an `Arc` and may run
/// concurrently. Builds and loads on one instance are serialized; separate
/// instances pointed at the same directory must be serialized by the caller.
pub struct Retriever {
    /// Configuration.
    config: RetrieverConfig,

    /// Artifact storage.
    store: IndexStore,

    /// Index backend, checked for availability before every build.
    backend: Arc<dyn VectorIndexBackend>,

    /// Resident index, if built or loaded.
    resident: RwLock<Option<Arc<ResidentIndex>>>,

    /// Serializes builds and loads.
    writer: Mutex<()>,
}

impl Retriever {
    /// Create a new retriever builder.
    pub fn builder() -> RetrieverBuilder {
        RetrieverBuilder::new()
    }

    /// Create a retriever with the built-in exact backend.
    pub fn new(config: RetrieverConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(ExactL2Backend))
    }

    /// Create a retriever with a specific index backend.
    ///
    /// Fails with `DependencyUnavailable` if the backend cannot run.
    pub fn with_backend(
        config: RetrieverConfig,
        backend: Arc<dyn VectorIndexBackend>,
    ) -> Result<Self> {
        config.validate()?;
        ensure_available(backend.as_ref())?;

        let store = IndexStore::new(&config.storage_dir);
        info!(
            "Initialized retriever at {} with backend {}",
            store.root().display(),
            backend.name()
        );

        Ok(Self {
            config,
            store,
            backend,
            resident: RwLock::new(None),
            writer: Mutex::new(()),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Artifact storage in use.
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Chunk `text`, embed the chunks with `provider`, then build and persist
    /// the index.
    ///
    /// Nothing is persisted and the resident index is untouched unless every
    /// step succeeds.
    pub async fn index_text(
        &self,
        text: &str,
        provider: &dyn EmbeddingProvider,
    ) -> Result<IndexSummary> {
        let chunks: Vec<String> = self
            .config
            .chunking
            .split(text)?
            .into_iter()
            .map(|chunk| chunk.text)
            .collect();
        if chunks.is_empty() {
            return Err(RetrievalError::EmptyInput(
                "no chunks generated from text".to_string(),
            ));
        }

        debug!(
            "Embedding {} chunks with provider {} ({})",
            chunks.len(),
            provider.name(),
            provider.model()
        );
        let embeddings = provider.embed_batch(&chunks).await?;
        validate_batch(chunks.len(), &embeddings)?;

        self.install(chunks, embeddings).await
    }

    /// Index chunks whose embeddings were computed elsewhere.
    ///
    /// `embeddings[i]` must be the embedding of `chunks[i]`.
    pub async fn index_chunks(
        &self,
        chunks: Vec<String>,
        embeddings: Vec<Embedding>,
    ) -> Result<IndexSummary> {
        if chunks.is_empty() {
            return Err(RetrievalError::EmptyInput("no chunks to index".to_string()));
        }
        if chunks.len() != embeddings.len() {
            return Err(RetrievalError::InvalidArgument(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        self.install(chunks, embeddings).await
    }

    async fn install(
        &self,
        chunks: Vec<String>,
        embeddings: Vec<Embedding>,
    ) -> Result<IndexSummary> {
        let _writer = self.writer.lock().await;

        ensure_available(self.backend.as_ref())?;
        let index = self.backend.build(&embeddings)?;
        self.store.save(&index, &chunks).await?;

        let resident = ResidentIndex { index, chunks };
        let summary = resident.summary();
        *self.resident.write().await = Some(Arc::new(resident));

        info!(
            "Indexed {} chunks with dimension {}",
            summary.chunks, summary.dimension
        );
        Ok(summary)
    }

    /// Load the stored artifacts, replacing any resident index.
    ///
    /// Fails with `NotFound` if nothing is stored and `Corrupt` if the stored
    /// pair cannot be trusted.
    pub async fn load(&self) -> Result<IndexSummary> {
        let _writer = self.writer.lock().await;
        let resident = self.load_locked().await?;
        Ok(resident.summary())
    }

    async fn load_locked(&self) -> Result<Arc<ResidentIndex>> {
        let (index, chunks) = self.store.load().await?;
        let resident = Arc::new(ResidentIndex { index, chunks });
        *self.resident.write().await = Some(Arc::clone(&resident));
        Ok(resident)
    }

    /// Return the resident index, loading it from storage if necessary.
    async fn resident_or_load(&self) -> Result<Arc<ResidentIndex>> {
        if let Some(resident) = self.resident.read().await.clone() {
            return Ok(resident);
        }

        let _writer = self.writer.lock().await;
        // Another caller may have built or loaded while we waited.
        if let Some(resident) = self.resident.read().await.clone() {
            return Ok(resident);
        }

        debug!(
            "No resident index, loading from {}",
            self.store.root().display()
        );
        match self.load_locked().await {
            Ok(resident) => Ok(resident),
            Err(RetrievalError::NotFound(missing)) => {
                debug!("Nothing to auto-load: {missing}");
                Err(RetrievalError::IndexNotBuilt)
            }
            Err(e) => Err(e),
        }
    }

    /// Return the `top_k` chunks nearest to `query`, nearest first.
    ///
    /// Ties are ordered by chunk position. Fails with `IndexNotBuilt` when no
    /// index is resident and none is stored.
    pub async fn query(&self, query: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>> {
        let resident = self.resident_or_load().await?;

        let results = resident
            .index
            .search(query, top_k)?
            .into_iter()
            .map(|neighbor| -> Result<RetrievalResult> {
                let chunk = resident.chunks.get(neighbor.position).ok_or_else(|| {
                    RetrievalError::Corrupt(format!(
                        "index position {} has no chunk",
                        neighbor.position
                    ))
                })?;
                Ok(RetrievalResult {
                    position: neighbor.position,
                    chunk: chunk.clone(),
                    distance: neighbor.distance,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Query returned {} results (top_k={top_k})", results.len());
        Ok(results)
    }

    /// Check if an index is resident in memory.
    pub async fn is_built(&self) -> bool {
        self.resident.read().await.is_some()
    }

    /// Snapshot of the resident chunk texts.
    pub async fn chunks(&self) -> Option<Vec<String>> {
        self.resident
            .read()
            .await
            .as_ref()
            .map(|resident| resident.chunks.clone())
    }

    /// Get retriever statistics.
    pub async fn stats(&self) -> RetrieverStats {
        let summary = self.resident.read().await.as_ref().map(|r| r.summary());
        RetrieverStats {
            built: summary.is_some(),
            chunks: summary.map_or(0, |s| s.chunks),
            dimension: summary.map(|s| s.dimension),
            storage_dir: self.store.root().to_path_buf(),
            backend: self.backend.name().to_string(),
        }
    }
}

/// Builder for [`Retriever`].
pub struct RetrieverBuilder {
    config: RetrieverConfig,
    backend: Option<Arc<dyn VectorIndexBackend>>,
}

impl RetrieverBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: RetrieverConfig::default(),
            backend: None,
        }
    }

    /// Set the storage directory.
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = dir.into();
        self
    }

    /// Set the chunking parameters.
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.config.chunking = chunking;
        self
    }

    /// Set the index backend.
    pub fn with_backend(mut self, backend: Arc<dyn VectorIndexBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Build the retriever.
    pub fn build(self) -> Result<Retriever> {
        let backend: Arc<dyn VectorIndexBackend> = match self.backend {
            Some(backend) => backend,
            None => Arc::new(ExactL2Backend),
        };
        Retriever::with_backend(self.config, backend)
    }
}

impl Default for RetrieverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about a retriever.
#[derive(Debug, Clone, Serialize)]
pub struct RetrieverStats {
    /// Whether an index is resident.
    pub built: bool,

    /// Number of resident chunks.
    pub chunks: usize,

    /// Resident embedding dimension.
    pub dimension: Option<usize>,

    /// Storage directory.
    pub storage_dir: PathBuf,

    /// Index backend name.
    pub backend: String,
}
