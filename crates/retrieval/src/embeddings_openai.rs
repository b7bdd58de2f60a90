/// OpenAI embeddings provider using the `/v1/embeddings` endpoint.
use std::time::Duration;

use {
    async_trait::async_trait,
    reqwest::StatusCode,
    secrecy::ExposeSecret,
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
    tracing::{debug, warn},
};

use crate::{embeddings::EmbeddingProvider, error::EmbeddingError};

pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: secrecy::Secret<String>,
    base_url: String,
    model: String,
    dims: usize,
    /// Sent as `dimensions` when the model supports shortened vectors.
    requested_dims: Option<usize>,
    max_retries: usize,
    retry_base: Duration,
    provider_key: String,
}

fn compute_provider_key(base_url: &str, model: &str, dims: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"openai:");
    hasher.update(base_url.as_bytes());
    hasher.update(b":");
    hasher.update(model.as_bytes());
    hasher.update(b":");
    hasher.update(dims.to_le_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_key)
    }

    /// Like `new`, with a per-request HTTP timeout.
    pub fn with_timeout(api_key: String, timeout: Duration) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_key))
    }

    fn with_client(client: reqwest::Client, api_key: String) -> Self {
        let base_url = "https://api.openai.com".to_string();
        let model = "text-embedding-3-small".to_string();
        let dims = 1536;
        let provider_key = compute_provider_key(&base_url, &model, dims);
        Self {
            client,
            api_key: secrecy::Secret::new(api_key),
            base_url,
            model,
            dims,
            requested_dims: None,
            max_retries: 3,
            retry_base: Duration::from_millis(500),
            provider_key,
        }
    }

    pub fn with_model(mut self, model: String, dims: usize) -> Self {
        self.model = model;
        self.dims = dims;
        self.requested_dims = None;
        self.refresh_key();
        self
    }

    /// Use `model` and ask the API to shorten vectors to `dims`.
    pub fn with_requested_dimensions(mut self, model: String, dims: usize) -> Self {
        self.model = model;
        self.dims = dims;
        self.requested_dims = Some(dims);
        self.refresh_key();
        self
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self.refresh_key();
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base delay for exponential backoff between retries.
    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    fn refresh_key(&mut self) {
        self.provider_key = compute_provider_key(&self.base_url, &self.model, self.dims);
    }

    fn retry_backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        self.retry_base.saturating_mul(1 << capped)
    }
}

fn should_retry_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let req = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dims,
        };
        let url = format!("{}/v1/embeddings", self.base_url);

        let mut attempt = 0usize;
        loop {
            let sent = self
                .client
                .post(&url)
                .bearer_auth(self.api_key.expose_secret())
                .json(&req)
                .send()
                .await;

            let resp = match sent {
                Ok(resp) => resp,
                Err(e) if should_retry_error(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "embedding request failed, retrying");
                    tokio::time::sleep(self.retry_backoff(attempt)).await;
                    continue;
                },
                Err(e) => return Err(e.into()),
            };

            let status = resp.status();
            if !status.is_success() {
                let body = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "<body unavailable>".to_string());
                if should_retry_status(status) && attempt < self.max_retries {
                    attempt += 1;
                    warn!(attempt, %status, "embedding provider busy, retrying");
                    tokio::time::sleep(self.retry_backoff(attempt)).await;
                    continue;
                }
                return Err(EmbeddingError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let mut parsed: EmbeddingResponse = resp.json().await?;
            parsed.data.sort_by_key(|d| d.index);
            if parsed.data.len() != texts.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: texts.len(),
                    got: parsed.data.len(),
                });
            }
            debug!(count = texts.len(), model = %self.model, "embedded batch");
            return Ok(parsed.data.into_iter().map(|d| d.embedding).collect());
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn provider_key(&self) -> &str {
        &self.provider_key
    }
}
