/// Provider-agnostic embedding trait for generating vectors from text.
use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    folio_config::{EmbeddingBackend, EmbeddingsConfig},
    tracing::info,
};

use crate::{
    embeddings_hashing::HashingEmbeddingProvider, embeddings_openai::OpenAiEmbeddingProvider,
    error::EmbeddingError,
};

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of texts, one per input, same order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        match (out.pop(), out.is_empty()) {
            (Some(vector), true) => Ok(vector),
            (popped, _) => Err(EmbeddingError::CountMismatch {
                expected: 1,
                got: out.len() + usize::from(popped.is_some()),
            }),
        }
    }

    /// The model name used by this provider (e.g. "text-embedding-3-small").
    fn model_name(&self) -> &str;

    /// The dimensionality of the embeddings produced.
    fn dimensions(&self) -> usize;

    /// A stable key identifying this provider configuration.
    fn provider_key(&self) -> &str;
}

/// Build the provider selected by `config`.
pub fn provider_from_config(
    config: &EmbeddingsConfig,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    let provider: Arc<dyn EmbeddingProvider> = match config.effective_backend() {
        EmbeddingBackend::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| EmbeddingError::InvalidInput("missing OpenAI API key".into()))?;
            let attempt_timeout =
                per_attempt_timeout(Duration::from_secs(config.timeout_secs), config.max_retries);
            let mut provider = OpenAiEmbeddingProvider::with_timeout(api_key, attempt_timeout)?
                .with_base_url(config.base_url.clone())
                .with_max_retries(config.max_retries);
            provider = match config.dimensions {
                Some(dims) => provider.with_requested_dimensions(config.model.clone(), dims),
                None => provider.with_model(config.model.clone(), default_openai_dims(&config.model)),
            };
            Arc::new(provider)
        },
        EmbeddingBackend::Hashing | EmbeddingBackend::Auto => Arc::new(
            HashingEmbeddingProvider::new(config.dimensions.unwrap_or(
                HashingEmbeddingProvider::DEFAULT_DIMENSIONS,
            )),
        ),
    };
    info!(
        model = provider.model_name(),
        dims = provider.dimensions(),
        "embedding provider ready"
    );
    Ok(provider)
}

/// Split the overall embedding budget across the first attempt and its
/// retries, so a timed-out request can still be retried before the caller's
/// own deadline fires.
fn per_attempt_timeout(total: Duration, max_retries: usize) -> Duration {
    let attempts = u32::try_from(max_retries.saturating_add(1)).unwrap_or(u32::MAX);
    (total / attempts).max(MIN_ATTEMPT_TIMEOUT.min(total))
}

const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

fn default_openai_dims(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}
