use std::time::Duration;

/// Failure while turning text into vectors. Never carries partial results.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("embedding provider returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("cannot embed input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("cannot upsert an empty batch")]
    EmptyBatch,

    #[error("invalid index entry {id:?}: {reason}")]
    InvalidEntry { id: String, reason: &'static str },

    #[error("dimension mismatch: index holds {expected}-d vectors, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Errors surfaced by [`crate::RetrievalService`].
///
/// `Validation` is the caller's fault (blank input, nothing to index); the
/// other variants are backend failures.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl RetrievalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
