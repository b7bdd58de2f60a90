//! Ingest and answer: the two operations the gateway exposes.
//!
//! Ingest: text → [`Chunker`] → one embedding batch → [`VectorIndex::upsert`].
//! Answer: question → embedding → [`VectorIndex::query`] → joined chunk texts,
//! recorded in the [`ConversationLog`].
//!
//! Index query failures do not fail `answer`; they are logged and treated
//! as "no match". Embedding failures always propagate.

use std::{sync::Arc, time::Duration};

use {
    serde::Serialize,
    tracing::{debug, info, warn},
};

use folio_config::FolioConfig;

use crate::{
    chunker::Chunker,
    embeddings::{EmbeddingProvider, provider_from_config},
    error::{EmbeddingError, RetrievalError},
    history::{ConversationLog, ConversationTurn, DEFAULT_HISTORY_CAPACITY},
    index::{InMemoryIndex, IndexEntry, ScoredChunk, VectorIndex},
};

/// Returned when nothing relevant was retrieved.
pub const NO_MATCH_ANSWER: &str = "No relevant information found in the uploaded documents.";

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub chunk_count: usize,
    /// The window cap stopped chunking before the end of the text.
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    /// Conversation log right after this turn was recorded.
    pub history: Vec<ConversationTurn>,
    /// Chunks the answer was assembled from, best first.
    pub sources: Vec<ScoredChunk>,
}

pub struct RetrievalService {
    chunker: Chunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    history: ConversationLog,
    top_k: usize,
    embed_timeout: Duration,
}

impl RetrievalService {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            chunker: Chunker::default(),
            embedder,
            index,
            history: ConversationLog::new(DEFAULT_HISTORY_CAPACITY),
            top_k: DEFAULT_TOP_K,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }

    /// Build the service, its embedding provider and an empty in-memory index.
    pub fn from_config(config: &FolioConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let embedder = provider_from_config(&config.embeddings)?;
        let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        Ok(Self::new(embedder, Arc::new(InMemoryIndex::new()))
            .with_chunker(chunker)
            .with_top_k(config.retrieval.top_k)
            .with_history_capacity(config.retrieval.history_capacity)
            .with_embed_timeout(Duration::from_secs(config.embeddings.timeout_secs)))
    }

    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = ConversationLog::new(capacity);
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Chunk, embed and index extracted document text.
    pub async fn ingest(&self, text: &str) -> Result<IngestReport, RetrievalError> {
        if text.trim().is_empty() {
            return Err(RetrievalError::validation(
                "No text could be extracted from the document",
            ));
        }

        let chunks = self.chunker.split(text);
        let truncated = self.chunker.truncates(text);
        if chunks.is_empty() {
            return Err(RetrievalError::validation("Document produced no chunks"));
        }
        debug!(chars = text.chars().count(), chunks = chunks.len(), "chunked document");

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.timed(self.embedder.embed_batch(&texts)).await?;
        if embeddings.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                got: embeddings.len(),
            }
            .into());
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry {
                id: chunk.id,
                text: chunk.text,
                embedding,
            })
            .collect();
        let chunk_count = entries.len();
        self.index.upsert(entries).await?;

        if truncated {
            warn!(
                chars = text.chars().count(),
                chunks = chunk_count,
                "document exceeds the chunk cap, only its beginning was indexed"
            );
        }
        info!(chunks = chunk_count, "ingested document");
        Ok(IngestReport {
            chunk_count,
            truncated,
        })
    }

    /// Retrieve the closest chunks for `question` and record the turn.
    pub async fn answer(&self, question: &str) -> Result<Answer, RetrievalError> {
        let trimmed = question.trim();
        if trimmed.is_empty() {
            return Err(RetrievalError::validation("Question cannot be empty"));
        }

        let query = self.timed(self.embedder.embed(trimmed)).await?;

        let sources = match self.index.query(&query, self.top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "index query failed, answering without context");
                Vec::new()
            },
        };

        let answer = if sources.is_empty() {
            NO_MATCH_ANSWER.to_string()
        } else {
            sources
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        };

        let history = self
            .history
            .append(ConversationTurn::new(question, answer.clone()))
            .await;
        info!(hits = sources.len(), history = history.len(), "answered question");

        Ok(Answer {
            answer,
            history,
            sources,
        })
    }

    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.history.snapshot().await
    }

    pub async fn history_len(&self) -> usize {
        self.history.len().await
    }

    pub async fn indexed_chunks(&self) -> usize {
        self.index.len().await
    }

    /// Bound an embedding call by the configured deadline.
    async fn timed<T>(
        &self,
        call: impl Future<Output = Result<T, EmbeddingError>>,
    ) -> Result<T, EmbeddingError> {
        match tokio::time::timeout(self.embed_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(EmbeddingError::Timeout(self.embed_timeout)),
        }
    }
}
