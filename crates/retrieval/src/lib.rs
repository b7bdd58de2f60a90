//! Retrieval pipeline: raw text → chunked → embedded → cosine search in memory.
//!
//! [`RetrievalService`] ties the pieces together and owns the conversation
//! log; everything else is a leaf with its own tests.

pub mod chunker;
pub mod embeddings;
pub mod embeddings_hashing;
pub mod embeddings_openai;
pub mod error;
pub mod history;
pub mod index;
pub mod service;

pub use {
    chunker::{Chunk, Chunker},
    embeddings::EmbeddingProvider,
    error::{EmbeddingError, IndexError, RetrievalError},
    history::{ConversationLog, ConversationTurn},
    index::{InMemoryIndex, IndexEntry, ScoredChunk, VectorIndex},
    service::{Answer, IngestReport, NO_MATCH_ANSWER, RetrievalService},
};
