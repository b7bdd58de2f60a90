/// Config schema types (server, chunking, retrieval, embeddings).
use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub server: ServerConfig,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub embeddings: EmbeddingsConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Maximum accepted request body for uploads, in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8000,
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Sliding-window chunking, counted in characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks joined into an answer.
    pub top_k: usize,
    /// Conversation turns retained in memory.
    pub history_capacity: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            history_capacity: 10,
        }
    }
}

/// Which embedding backend to construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI when an API key is available, hashing otherwise.
    #[default]
    Auto,
    OpenAi,
    Hashing,
}

/// Embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub provider: EmbeddingBackend,

    /// API key for OpenAI-compatible endpoints. `OPENAI_API_KEY` fills this
    /// in when left unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    pub base_url: String,
    pub model: String,

    /// Requested vector size. Provider default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,

    /// Upper bound for a single embedding call, including retries.
    pub timeout_secs: u64,

    /// Retry attempts for rate limits and transient server errors.
    pub max_retries: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Auto,
            api_key: None,
            base_url: "https://api.openai.com".into(),
            model: "text-embedding-3-small".into(),
            dimensions: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl EmbeddingsConfig {
    /// Resolve `Auto` against the presence of an API key.
    pub fn effective_backend(&self) -> EmbeddingBackend {
        match self.provider {
            EmbeddingBackend::Auto if self.has_api_key() => EmbeddingBackend::OpenAi,
            EmbeddingBackend::Auto => EmbeddingBackend::Hashing,
            other => other,
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl FolioConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let chunking = &self.chunking;
        anyhow::ensure!(chunking.chunk_size > 0, "chunking.chunk_size must be positive");
        anyhow::ensure!(
            chunking.chunk_overlap < chunking.chunk_size,
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            chunking.chunk_overlap,
            chunking.chunk_size
        );
        anyhow::ensure!(self.retrieval.top_k > 0, "retrieval.top_k must be positive");
        anyhow::ensure!(
            self.retrieval.history_capacity > 0,
            "retrieval.history_capacity must be positive"
        );
        anyhow::ensure!(
            self.embeddings.timeout_secs > 0,
            "embeddings.timeout_secs must be positive"
        );
        if let Some(dims) = self.embeddings.dimensions {
            anyhow::ensure!(dims > 0, "embeddings.dimensions must be positive");
        }
        if self.embeddings.provider == EmbeddingBackend::OpenAi {
            anyhow::ensure!(
                self.embeddings.has_api_key(),
                "embeddings.provider = \"openai\" requires an API key (set OPENAI_API_KEY)"
            );
        }
        Ok(())
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.embeddings.api_key.is_some() {
            copy.embeddings.api_key = Some("********".into());
        }
        copy
    }
}
