//! Offline embeddings via signed feature hashing.
//!
//! Each lowercase alphanumeric token is hashed into one of `dims` buckets with
//! a ±1 sign, and the result is L2-normalised. Texts sharing vocabulary end up
//! close under cosine similarity. No network, fully deterministic.

use {
    async_trait::async_trait,
    sha2::{Digest, Sha256},
};

use crate::{embeddings::EmbeddingProvider, error::EmbeddingError};

pub struct HashingEmbeddingProvider {
    dims: usize,
    provider_key: String,
}

impl HashingEmbeddingProvider {
    pub const DEFAULT_DIMENSIONS: usize = 384;
    pub const MODEL: &'static str = "feature-hashing";

    pub fn new(dims: usize) -> Self {
        let dims = dims.max(1);
        Self {
            dims,
            provider_key: format!("hashing:{dims}"),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        for token in tokens(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let slot = (u64::from_le_bytes(bucket) % self.dims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn model_name(&self) -> &str {
        Self::MODEL
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn provider_key(&self) -> &str {
        &self.provider_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn deterministic_and_fixed_dimension() {
        let p = HashingEmbeddingProvider::new(64);
        let texts = vec!["The quick brown fox".to_string(), "".to_string()];
        let a = p.embed_batch(&texts).await.unwrap();
        let b = p.embed_batch(&texts).await.unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|v| v.len() == 64));
    }

    #[tokio::test]
    async fn vectors_are_unit_length() {
        let p = HashingEmbeddingProvider::default();
        let v = p.embed("rust borrow checker lifetimes").await.unwrap();
        let norm = cosine(&v, &v).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn textless_input_is_zero_vector() {
        let p = HashingEmbeddingProvider::new(16);
        let v = p.embed("?!  ...").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn shared_vocabulary_scores_higher() {
        let p = HashingEmbeddingProvider::default();
        let query = p.embed("What is the refund policy?").await.unwrap();
        let related = p
            .embed("Our refund policy allows returns within 30 days.")
            .await
            .unwrap();
        let unrelated = p
            .embed("Photosynthesis converts light into chemical energy.")
            .await
            .unwrap();
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        let p = HashingEmbeddingProvider::new(32);
        assert_eq!(p.embed_one("Hello, World!"), p.embed_one("hello world"));
    }

    #[test]
    fn zero_dims_is_clamped() {
        assert_eq!(HashingEmbeddingProvider::new(0).dimensions(), 1);
    }
}
