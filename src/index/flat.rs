// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flat (exhaustive) vector index using squared Euclidean distance.
//!
//! Vectors are stored contiguously at `f32` precision and compared against
//! the query one by one. Vectors are not normalized here; the provider that
//! built the index must also embed the queries.

use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::corpus::VerseId;
use crate::errors::IndexError;

/// Provenance recorded alongside the vectors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexMeta {
    /// Model id of the provider that produced the vectors
    pub model_id: String,
    /// Corpus epoch the index was built against
    pub corpus_epoch: u64,
}

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub id: VerseId,
    /// Squared L2 distance; smaller is more similar
    pub distance: f32,
}

/// Identity-mapped flat index.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    pub(super) dimension: usize,
    pub(super) ids: Vec<VerseId>,
    pub(super) vectors: Vec<f32>,
    pub(super) meta: IndexMeta,
}

impl FlatIndex {
    /// Builds an index from the full `(identity, vector)` list in one pass.
    ///
    /// All vectors must share one dimension and identities must be unique.
    pub fn from_entries(
        entries: Vec<(VerseId, Vec<f32>)>,
        meta: IndexMeta,
    ) -> Result<Self, IndexError> {
        let dimension = entries.first().map(|(_, v)| v.len()).unwrap_or(0);
        if !entries.is_empty() && dimension == 0 {
            return Err(IndexError::Corrupt("vectors have zero dimension".into()));
        }

        let mut seen = HashSet::with_capacity(entries.len());
        let mut ids = Vec::with_capacity(entries.len());
        let mut vectors = Vec::with_capacity(entries.len() * dimension);

        for (id, vector) in entries {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            if !seen.insert(id) {
                return Err(IndexError::Corrupt(format!("duplicate identity {}", id)));
            }
            ids.push(id);
            vectors.extend_from_slice(&vector);
        }

        Ok(Self {
            dimension,
            ids,
            vectors,
            meta,
        })
    }

    /// Returns up to `k` nearest entries, ascending by distance, ties broken
    /// by identity ascending.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        if k == 0 {
            return Err(IndexError::InvalidK);
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut hits: Vec<Neighbor> = self
            .vectors
            .par_chunks_exact(self.dimension)
            .zip(self.ids.par_iter())
            .map(|(vector, &id)| Neighbor {
                id,
                distance: squared_l2(query, vector),
            })
            .collect();

        if k < hits.len() {
            hits.select_nth_unstable_by(k - 1, rank);
            hits.truncate(k);
        }
        hits.sort_unstable_by(rank);

        Ok(hits)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Vector dimension (0 for an empty index).
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    /// Identities in insertion order.
    pub fn ids(&self) -> &[VerseId] {
        &self.ids
    }

    /// Iterates `(identity, vector)` pairs in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (VerseId, &[f32])> + '_ {
        // chunks_exact panics on a zero chunk size; an empty index has dimension 0.
        let chunk = self.dimension.max(1);
        self.ids.iter().copied().zip(self.vectors.chunks_exact(chunk))
    }
}

fn rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.id.cmp(&b.id))
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: Vec<(i64, Vec<f32>)>) -> FlatIndex {
        FlatIndex::from_entries(
            entries.into_iter().map(|(id, v)| (VerseId(id), v)).collect(),
            IndexMeta::default(),
        )
        .unwrap()
    }

    fn ids(hits: &[Neighbor]) -> Vec<i64> {
        hits.iter().map(|h| h.id.0).collect()
    }

    #[test]
    fn test_search_orders_by_distance() {
        let idx = index(vec![
            (10, vec![0.0, 0.0]),
            (20, vec![3.0, 4.0]),
            (30, vec![1.0, 0.0]),
        ]);

        let hits = idx.search(&[0.9, 0.0], 3).unwrap();
        assert_eq!(ids(&hits), vec![30, 10, 20]);
        assert!((hits[0].distance - 0.01).abs() < 1e-6);
        assert!((hits[1].distance - 0.81).abs() < 1e-6);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_search_truncates_to_k() {
        let idx = index((1..=20).map(|i| (i, vec![i as f32])).collect());

        let hits = idx.search(&[0.0], 5).unwrap();
        assert_eq!(ids(&hits), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_search_k_larger_than_index_returns_all_sorted() {
        let idx = index(vec![(3, vec![5.0]), (1, vec![1.0]), (2, vec![2.0])]);

        let hits = idx.search(&[0.0], 100).unwrap();
        assert_eq!(ids(&hits), vec![1, 2, 3]);
    }

    #[test]
    fn test_ties_broken_by_identity() {
        let idx = index(vec![
            (9, vec![1.0, 0.0]),
            (4, vec![0.0, 1.0]),
            (7, vec![-1.0, 0.0]),
            (2, vec![5.0, 5.0]),
        ]);

        let hits = idx.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(ids(&hits), vec![4, 7]);

        let all = idx.search(&[0.0, 0.0], 4).unwrap();
        assert_eq!(ids(&all), vec![4, 7, 9, 2]);
    }

    #[test]
    fn test_zero_k_rejected() {
        let idx = index(vec![(1, vec![1.0])]);
        assert!(matches!(idx.search(&[1.0], 0), Err(IndexError::InvalidK)));
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let idx = FlatIndex::from_entries(Vec::new(), IndexMeta::default()).unwrap();
        assert!(idx.is_empty());
        assert_eq!(idx.dimension(), 0);
        assert!(idx.search(&[1.0, 2.0], 3).unwrap().is_empty());
        assert_eq!(idx.entries().count(), 0);
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let idx = index(vec![(1, vec![1.0, 2.0])]);
        let err = idx.search(&[1.0], 1).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch { expected: 2, actual: 1 }
        ));
    }

    #[test]
    fn test_inconsistent_dimensions_rejected() {
        let err = FlatIndex::from_entries(
            vec![(VerseId(1), vec![1.0, 2.0]), (VerseId(2), vec![1.0])],
            IndexMeta::default(),
        )
        .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let err = FlatIndex::from_entries(
            vec![(VerseId(1), vec![1.0]), (VerseId(1), vec![2.0])],
            IndexMeta::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "CorruptIndexError");
    }

    #[test]
    fn test_entries_preserve_pairing() {
        let idx = index(vec![(5, vec![1.0, 2.0]), (3, vec![3.0, 4.0])]);
        let entries: Vec<_> = idx.entries().map(|(id, v)| (id.0, v.to_vec())).collect();
        assert_eq!(entries, vec![(5, vec![1.0, 2.0]), (3, vec![3.0, 4.0])]);
    }
}
