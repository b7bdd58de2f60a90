/// Vector index abstraction and an in-memory cosine implementation.
use std::collections::HashMap;

use {async_trait::async_trait, serde::Serialize, tokio::sync::RwLock, tracing::debug};

use crate::error::IndexError;

/// An (id, text, vector) triple to store. Ids are unique; re-inserting an id
/// replaces the previous entry.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A query hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace entries. All-or-nothing: the batch is validated
    /// before anything is written.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError>;

    /// Up to `k` entries, most similar first. An empty index yields `Ok(vec![])`.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IndexError>;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

struct StoredEntry {
    text: String,
    embedding: Vec<f32>,
    norm: f32,
}

#[derive(Default)]
struct IndexState {
    /// Fixed by the first successful upsert.
    dimension: Option<usize>,
    entries: HashMap<String, StoredEntry>,
}

/// Exhaustive cosine search over entries held in memory.
///
/// Writers take the lock exclusively; queries share it.
#[derive(Default)]
pub struct InMemoryIndex {
    state: RwLock<IndexState>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vector dimension, once anything has been inserted.
    pub async fn dimension(&self) -> Option<usize> {
        self.state.read().await.dimension
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with the stored norm precomputed. Zero vectors score 0.
fn cosine_similarity(query: &[f32], query_norm: f32, stored: &StoredEntry) -> f32 {
    let denom = query_norm * stored.norm;
    if denom <= f32::EPSILON {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(&stored.embedding).map(|(a, b)| a * b).sum();
    (dot / denom).clamp(-1.0, 1.0)
}

fn validate_batch(entries: &[IndexEntry], current: Option<usize>) -> Result<usize, IndexError> {
    let Some(first) = entries.first() else {
        return Err(IndexError::EmptyBatch);
    };
    let expected = current.unwrap_or(first.embedding.len());

    for entry in entries {
        let invalid = |reason| IndexError::InvalidEntry {
            id: entry.id.clone(),
            reason,
        };
        if entry.id.trim().is_empty() {
            return Err(invalid("missing id"));
        }
        if entry.embedding.is_empty() {
            return Err(invalid("missing embedding"));
        }
        if entry.embedding.iter().any(|x| !x.is_finite()) {
            return Err(invalid("embedding contains non-finite values"));
        }
        if entry.embedding.len() != expected {
            return Err(IndexError::DimensionMismatch {
                expected,
                got: entry.embedding.len(),
            });
        }
    }
    Ok(expected)
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        let mut state = self.state.write().await;
        let dimension = validate_batch(&entries, state.dimension)?;
        state.dimension = Some(dimension);

        let count = entries.len();
        for entry in entries {
            let norm = l2_norm(&entry.embedding);
            state.entries.insert(entry.id, StoredEntry {
                text: entry.text,
                embedding: entry.embedding,
                norm,
            });
        }
        debug!(count, total = state.entries.len(), "upserted index entries");
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        let state = self.state.read().await;
        if state.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(expected) = state.dimension
            && vector.len() != expected
        {
            return Err(IndexError::DimensionMismatch {
                expected,
                got: vector.len(),
            });
        }

        let query_norm = l2_norm(vector);
        let mut scored: Vec<(&String, &StoredEntry, f32)> = state
            .entries
            .iter()
            .map(|(id, entry)| (id, entry, cosine_similarity(vector, query_norm, entry)))
            .collect();
        scored.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(id, entry, score)| ScoredChunk {
                id: id.clone(),
                text: entry.text.clone(),
                score,
            })
            .collect())
    }

    async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::sync::Arc};

    fn entry(id: &str, text: &str, embedding: &[f32]) -> IndexEntry {
        IndexEntry {
            id: id.into(),
            text: text.into(),
            embedding: embedding.to_vec(),
        }
    }

    async fn seeded() -> InMemoryIndex {
        let index = InMemoryIndex::new();
        index
            .upsert(vec![
                entry("x", "east", &[1.0, 0.0, 0.0]),
                entry("y", "north", &[0.0, 1.0, 0.0]),
                entry("xy", "north-east", &[1.0, 1.0, 0.0]),
                entry("z", "up", &[0.0, 0.0, 1.0]),
            ])
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn query_on_empty_index_is_empty() {
        let index = InMemoryIndex::new();
        assert!(index.query(&[1.0, 2.0], 3).await.unwrap().is_empty());
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let index = InMemoryIndex::new();
        assert!(matches!(index.upsert(vec![]).await, Err(IndexError::EmptyBatch)));
    }

    #[tokio::test]
    async fn invalid_entries_are_rejected() {
        let index = InMemoryIndex::new();
        let err = index.upsert(vec![entry(" ", "t", &[1.0])]).await.unwrap_err();
        assert!(matches!(err, IndexError::InvalidEntry { reason: "missing id", .. }));

        let err = index.upsert(vec![entry("a", "t", &[])]).await.unwrap_err();
        assert!(matches!(err, IndexError::InvalidEntry { .. }));

        let err = index.upsert(vec![entry("a", "t", &[f32::NAN])]).await.unwrap_err();
        assert!(matches!(err, IndexError::InvalidEntry { .. }));
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn bad_batch_writes_nothing() {
        let index = InMemoryIndex::new();
        let result = index
            .upsert(vec![entry("a", "t", &[1.0, 0.0]), entry("b", "t", &[1.0])])
            .await;
        assert!(matches!(
            result,
            Err(IndexError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        ));
        assert_eq!(index.len().await, 0);
        assert_eq!(index.dimension().await, None);
    }

    #[tokio::test]
    async fn results_ranked_by_cosine() {
        let index = seeded().await;
        let hits = index.query(&[1.0, 0.2, 0.0], 3).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "xy", "y"]);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(hits[0].text, "east");
    }

    #[tokio::test]
    async fn k_bounds_result_length() {
        let index = seeded().await;
        assert_eq!(index.query(&[1.0, 0.0, 0.0], 2).await.unwrap().len(), 2);
        assert_eq!(index.query(&[1.0, 0.0, 0.0], 10).await.unwrap().len(), 4);
        assert!(index.query(&[1.0, 0.0, 0.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exact_match_scores_one() {
        let index = seeded().await;
        let hits = index.query(&[0.0, 0.0, 5.0], 1).await.unwrap();
        assert_eq!(hits[0].id, "z");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_id() {
        let index = seeded().await;
        index
            .upsert(vec![entry("z", "down", &[0.0, 0.0, -1.0])])
            .await
            .unwrap();
        assert_eq!(index.len().await, 4);
        let hits = index.query(&[0.0, 0.0, -1.0], 1).await.unwrap();
        assert_eq!(hits[0].id, "z");
        assert_eq!(hits[0].text, "down");
    }

    #[tokio::test]
    async fn query_dimension_mismatch_is_an_error() {
        let index = seeded().await;
        assert!(matches!(
            index.query(&[1.0, 0.0], 3).await,
            Err(IndexError::DimensionMismatch {
                expected: 3,
                got: 2
            })
        ));
    }

    #[tokio::test]
    async fn zero_query_vector_scores_zero() {
        let index = seeded().await;
        let hits = index.query(&[0.0, 0.0, 0.0], 4).await.unwrap();
        assert_eq!(hits.len(), 4);
        assert!(hits.iter().all(|h| h.score == 0.0));
    }

    #[tokio::test]
    async fn concurrent_upserts_and_queries() {
        let index = Arc::new(InMemoryIndex::new());
        let mut tasks = Vec::new();
        for i in 0..16 {
            let index = Arc::clone(&index);
            tasks.push(tokio::spawn(async move {
                index
                    .upsert(vec![entry(&format!("e{i}"), "t", &[1.0, i as f32])])
                    .await
                    .unwrap();
                index.query(&[1.0, 0.0], 3).await.unwrap().len()
            }));
        }
        for task in tasks {
            let n = task.await.unwrap();
            assert!((1..=3).contains(&n));
        }
        assert_eq!(index.len().await, 16);
    }
}
