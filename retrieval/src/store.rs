//! Index persistence.
//!
//! The `IndexStore` keeps a chunk list and its index as a pair of files in one
//! directory:
//!
//! - `chunks.json`: JSON array of chunk texts, in position order
//! - `index.bin`: [`FlatIndex`] binary encoding
//!
//! The index header carries the SHA-256 of the exact `chunks.json` bytes it was
//! written with, so a chunk list from another build is detected on load.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use adjacent_embeddings::{FlatIndex, LINK_LEN};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{Result, RetrievalError};

/// File name of the chunk list artifact.
pub const CHUNKS_FILE: &str = "chunks.json";

/// File name of the index artifact.
pub const INDEX_FILE: &str = "index.bin";

const TMP_SUFFIX: &str = "tmp";

/// Storage for one chunk list and index pair.
#[derive(Debug, Clone)]
pub struct IndexStore {
    /// Directory holding both artifacts.
    root: PathBuf,
}

impl IndexStore {
    /// Create a store rooted at `root`. Nothing is touched until `save`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory holding both artifacts.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the chunk list artifact.
    pub fn chunks_path(&self) -> PathBuf {
        self.root.join(CHUNKS_FILE)
    }

    /// Path of the index artifact.
    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    /// Check if both artifacts are present.
    pub async fn exists(&self) -> bool {
        let chunks = fs::try_exists(self.chunks_path()).await.unwrap_or(false);
        let index = fs::try_exists(self.index_path()).await.unwrap_or(false);
        chunks && index
    }

    /// Persist `index` together with its chunk texts.
    ///
    /// Both artifacts are written to temporary files first. If either write
    /// fails, the temporaries are removed and the previous pair is left as it
    /// was. The chunk list is then renamed into place, followed by the index.
    /// A swap interrupted between the two renames leaves a new chunk list next
    /// to the old index, which fails the link check on load as `Corrupt`,
    /// never as a silently mismatched pair. A failed rename removes whatever
    /// temporaries remain.
    pub async fn save(&self, index: &FlatIndex, chunks: &[String]) -> Result<()> {
        if chunks.len() != index.len() {
            return Err(RetrievalError::InvalidArgument(format!(
                "{} chunks cannot pair with an index of {} vectors",
                chunks.len(),
                index.len()
            )));
        }

        let chunk_bytes = serde_json::to_vec(chunks)?;
        let index_bytes = index.encode(&link_for(&chunk_bytes));

        fs::create_dir_all(&self.root).await?;

        let chunks_path = self.chunks_path();
        let index_path = self.index_path();
        let chunks_tmp = chunks_path.with_extension(format!("json.{TMP_SUFFIX}"));
        let index_tmp = index_path.with_extension(format!("bin.{TMP_SUFFIX}"));

        let written = async {
            fs::write(&chunks_tmp, &chunk_bytes).await?;
            fs::write(&index_tmp, &index_bytes).await
        }
        .await;
        if let Err(e) = written {
            remove_if_present(&chunks_tmp).await;
            remove_if_present(&index_tmp).await;
            return Err(e.into());
        }

        let swapped = async {
            fs::rename(&chunks_tmp, &chunks_path).await?;
            fs::rename(&index_tmp, &index_path).await
        }
        .await;
        if let Err(e) = swapped {
            remove_if_present(&chunks_tmp).await;
            remove_if_present(&index_tmp).await;
            return Err(e.into());
        }
        debug!("Swapped new artifacts into {}", self.root.display());

        info!(
            "Saved {} chunks and index (dimension {}) to {}",
            chunks.len(),
            index.dimension(),
            self.root.display()
        );
        Ok(())
    }

    /// Read the pair back.
    ///
    /// Fails with `NotFound` if either artifact is missing and with `Corrupt`
    /// if either cannot be decoded or they do not belong together.
    pub async fn load(&self) -> Result<(FlatIndex, Vec<String>)> {
        let chunk_bytes = read_artifact(&self.chunks_path()).await?;
        let index_bytes = read_artifact(&self.index_path()).await?;

        let chunks: Vec<String> = serde_json::from_slice(&chunk_bytes).map_err(|e| {
            RetrievalError::Corrupt(format!("{}: {e}", self.chunks_path().display()))
        })?;
        let (index, link) = FlatIndex::decode(&index_bytes).map_err(|e| {
            RetrievalError::Corrupt(format!("{}: {e}", self.index_path().display()))
        })?;

        if link != link_for(&chunk_bytes) {
            return Err(RetrievalError::Corrupt(
                "chunk list was not written with this index".to_string(),
            ));
        }
        if chunks.len() != index.len() {
            return Err(RetrievalError::Corrupt(format!(
                "{} chunks stored for an index of {} vectors",
                chunks.len(),
                index.len()
            )));
        }

        info!(
            "Loaded {} chunks and index (dimension {}) from {}",
            chunks.len(),
            index.dimension(),
            self.root.display()
        );
        Ok((index, chunks))
    }
}

fn link_for(chunk_bytes: &[u8]) -> [u8; LINK_LEN] {
    let mut link = [0u8; LINK_LEN];
    link.copy_from_slice(&Sha256::digest(chunk_bytes));
    link
}

async fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            RetrievalError::NotFound(path.display().to_string())
        } else {
            RetrievalError::Io(e)
        }
    })
}

async fn remove_if_present(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove temporary file {}: {e}", path.display()),
    }
}
