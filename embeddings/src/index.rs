//! Exact nearest-neighbor index over a fixed-dimension embedding matrix.
//!
//! [`FlatIndex`] stores every vector row-major as `f32` and answers queries by
//! brute force, so results are exact. Rows are addressed by their 0-based
//! insertion position; the index owns no text.
//!
//! # Binary format
//!
//! All integers are little-endian.
//!
//! ```text
//! magic    8 bytes   "ADJFLAT\0"
//! version  u32       1
//! metric   u32       0 = squared L2
//! dim      u32
//! count    u64
//! link     32 bytes  opaque tag chosen by the writer
//! values   count * dim * f32
//! checksum 32 bytes  SHA-256 over everything above
//! ```

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::{Neighbor, find_top_k};

/// Length of the link tag carried in the index header.
pub const LINK_LEN: usize = 32;

const MAGIC: &[u8; 8] = b"ADJFLAT\0";
const FORMAT_VERSION: u32 = 1;
const METRIC_SQUARED_L2: u32 = 0;
const HEADER_LEN: usize = MAGIC.len() + 4 + 4 + 4 + 8 + LINK_LEN;
const CHECKSUM_LEN: usize = 32;

/// An exhaustive squared-L2 index.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    /// Width of every stored vector.
    dimension: usize,

    /// Row-major vector storage, `len() * dimension` values.
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimension` values.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbeddingError::InvalidArgument(
                "index dimension must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Build an index from an `n x d` embedding matrix.
    ///
    /// The dimension is taken from the first row; every other row must match
    /// it. An empty matrix, or one whose rows are empty, is rejected.
    pub fn build(embeddings: &[Embedding]) -> Result<Self> {
        let first = embeddings.first().ok_or_else(|| {
            EmbeddingError::InvalidArgument("embedding matrix has no rows".to_string())
        })?;
        if first.is_empty() {
            return Err(EmbeddingError::InvalidArgument(
                "embedding matrix is not 2-dimensional: rows are empty".to_string(),
            ));
        }

        let mut index = Self::new(first.len())?;
        index.add(embeddings)?;
        info!(
            "Built flat index with {} vectors of dimension {}",
            index.len(),
            index.dimension
        );
        Ok(index)
    }

    /// Append rows. Every row is checked before any is stored.
    fn add(&mut self, embeddings: &[Embedding]) -> Result<()> {
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        self.data.reserve(embeddings.len() * self.dimension);
        for embedding in embeddings {
            self.data.extend_from_slice(embedding);
        }
        debug!("Added {} vectors to flat index", embeddings.len());
        Ok(())
    }

    /// Width of the stored vectors.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    /// Check if the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the `k` nearest vectors to `query`, nearest first.
    ///
    /// Ties are ordered by ascending position. `k == 0` yields no results and
    /// `k` larger than the index yields every vector.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let rows = self.data.chunks_exact(self.dimension);
        let results = find_top_k(query, rows, k.min(self.len()))?;
        debug!("Flat index search returned {} of k={k}", results.len());
        Ok(results)
    }

    /// Serialize the index, embedding `link` in the header.
    pub fn encode(&self, link: &[u8; LINK_LEN]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4 + CHECKSUM_LEN);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&METRIC_SQUARED_L2.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        bytes.extend_from_slice(link);
        for value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }

        let checksum = Sha256::digest(&bytes);
        bytes.extend_from_slice(&checksum);
        bytes
    }

    /// Deserialize an index produced by [`FlatIndex::encode`], returning the
    /// index and its link tag.
    pub fn decode(bytes: &[u8]) -> Result<(Self, [u8; LINK_LEN])> {
        if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(corrupt(format!(
                "truncated: {} bytes is shorter than the header",
                bytes.len()
            )));
        }

        let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if Sha256::digest(body).as_slice() != checksum {
            return Err(corrupt("checksum mismatch".to_string()));
        }

        let mut reader = ByteReader::new(body);
        if reader.take(MAGIC.len())? != MAGIC {
            return Err(corrupt("bad magic".to_string()));
        }
        let version = reader.u32()?;
        if version != FORMAT_VERSION {
            return Err(corrupt(format!("unsupported format version {version}")));
        }
        let metric = reader.u32()?;
        if metric != METRIC_SQUARED_L2 {
            return Err(corrupt(format!("unsupported metric id {metric}")));
        }
        let dimension = reader.u32()? as usize;
        let count = usize::try_from(reader.u64()?)
            .map_err(|_| corrupt("vector count overflows usize".to_string()))?;
        if dimension == 0 || count == 0 {
            return Err(corrupt(format!(
                "empty index (count={count}, dimension={dimension})"
            )));
        }

        let mut link = [0u8; LINK_LEN];
        link.copy_from_slice(reader.take(LINK_LEN)?);

        let expected = count
            .checked_mul(dimension)
            .and_then(|values| values.checked_mul(4))
            .ok_or_else(|| corrupt("vector payload size overflows".to_string()))?;
        let payload = reader.rest();
        if payload.len() != expected {
            return Err(corrupt(format!(
                "payload is {} bytes, expected {expected}",
                payload.len()
            )));
        }

        let data = payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok((Self { dimension, data }, link))
    }
}

fn corrupt(message: String) -> EmbeddingError {
    EmbeddingError::CorruptIndex(message)
}

/// Cursor over a byte slice that reports short reads as corruption.
struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| corrupt(format!("truncated at byte {}", self.offset)))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.offset..];
        self.offset = self.bytes.len();
        slice
    }
}
