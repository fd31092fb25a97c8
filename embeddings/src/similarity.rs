//! Distance and similarity computation for embeddings.

use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, Result};

/// Compute the squared euclidean distance between two embeddings.
///
/// This is the ranking metric of [`crate::FlatIndex`]: lower means more
/// similar, and `0.0` means identical vectors.
pub fn squared_l2_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    check_dimensions(a, b)?;
    Ok(a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum())
}

/// Normalize an embedding to unit length.
pub fn normalize(embedding: &mut [f32]) {
    let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in embedding.iter_mut() {
            *x /= magnitude;
        }
    }
}

fn check_dimensions(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// A nearest-neighbor hit: a row position and its squared L2 distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// 0-based row of the matched vector.
    pub position: usize,

    /// Squared euclidean distance to the query.
    pub distance: f32,
}

/// Find the `k` candidates closest to `query`.
///
/// Results are ordered by ascending distance; equal distances are ordered by
/// ascending position. At most `min(k, candidates)` results are returned.
pub fn find_top_k<'a>(
    query: &[f32],
    candidates: impl IntoIterator<Item = &'a [f32]>,
    k: usize,
) -> Result<Vec<Neighbor>> {
    if k == 0 {
        return Ok(Vec::new());
    }

    // Max-heap on (distance, position): the worst kept candidate sits on top.
    // Grows with the candidates seen, never with `k`.
    let mut heap: BinaryHeap<(OrderedFloat<f32>, usize)> = BinaryHeap::new();

    for (position, candidate) in candidates.into_iter().enumerate() {
        let distance = OrderedFloat(squared_l2_distance(query, candidate)?);
        if heap.len() < k {
            heap.push((distance, position));
            continue;
        }
        let replaces_worst = heap
            .peek()
            .is_some_and(|&worst| (distance, position) < worst);
        if replaces_worst {
            heap.pop();
            heap.push((distance, position));
        }
    }

    Ok(heap
        .into_sorted_vec()
        .into_iter()
        .map(|(distance, position)| Neighbor {
            position,
            distance: distance.0,
        })
        .collect())
}
