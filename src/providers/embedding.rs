//! `EmbeddingProvider`: the abstract boundary to the external embedding
//! service, plus a real HTTP implementation and a deterministic test double.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};

const MAX_INPUT_CHARS: usize = 8192;

/// Maps text to a fixed-length embedding vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dimension(&self) -> usize;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Posts to `{base}/embeddings`, retrying transient failures with an
/// exponential `retry_delay_ms * attempt` backoff, bounded by `max_retries`.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
    max_retries: u32,
    retry_delay: Duration,
    limiter: Arc<Semaphore>,
}

impl HttpEmbeddingProvider {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, dimension: usize, config: &EngineConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            dimension,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            limiter: Arc::new(Semaphore::new(config.max_concurrent_requests)),
        }
    }

    /// Returns the embedding, or an error tagged with whether retrying it
    /// could plausibly succeed: network failures, timeouts and 5xx responses
    /// are retryable; 4xx responses are a caller/request problem and aren't.
    async fn embed_once(&self, prompt: &str) -> std::result::Result<Vec<f32>, EmbedAttemptError> {
        let url = format!("{}/embeddings", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { model: &self.model, prompt })
            .send()
            .await
            .map_err(EmbedAttemptError::from_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let retryable = status.is_server_error();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedAttemptError {
                retryable,
                error: EngineError::EmbeddingFailure(format!("{status}: {body}")),
            });
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| EmbedAttemptError {
            retryable: false,
            error: EngineError::EmbeddingFailure(e.to_string()),
        })?;
        Ok(parsed.embedding)
    }
}

struct EmbedAttemptError {
    retryable: bool,
    error: EngineError,
}

impl EmbedAttemptError {
    /// `send()` only fails below the HTTP layer (connect, timeout, DNS) —
    /// always worth a retry, unlike a 4xx that came back as a real response.
    fn from_transport(e: reqwest::Error) -> Self {
        Self { retryable: true, error: EngineError::Http(e) }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let _permit = self.limiter.acquire().await.map_err(|e| EngineError::EmbeddingFailure(e.to_string()))?;

        let truncated = if text.chars().count() > MAX_INPUT_CHARS {
            tracing::warn!(len = text.len(), "embedding input truncated to {} characters", MAX_INPUT_CHARS);
            text.chars().take(MAX_INPUT_CHARS).collect::<String>()
        } else {
            text.to_string()
        };

        let mut attempt = 0u32;
        loop {
            match self.embed_once(&truncated).await {
                Ok(embedding) => return Ok(embedding),
                Err(e) if e.retryable && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e.error, "embedding request failed, retrying");
                    sleep(self.retry_delay * attempt).await;
                }
                Err(e) => return Err(e.error),
            }
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic hash-based embedding for tests: no network calls, stable
/// across runs for the same input.
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut embedding = vec![0.0f32; self.dimension];
        for (i, v) in embedding.iter_mut().enumerate() {
            *v = ((hash.wrapping_add(i as u64)) as f32).sin();
        }
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.max_retries = 2;
        config.retry_delay_ms = 1;
        config
    }

    #[tokio::test]
    async fn http_provider_returns_embedding_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": [0.1, 0.2, 0.3]})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(server.uri(), "test-model", 3, &fast_retry_config());
        let embedding = provider.embed("hello world").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn http_provider_retries_server_errors_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": [1.0]})))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(server.uri(), "test-model", 1, &fast_retry_config());
        let embedding = provider.embed("retry me").await.unwrap();
        assert_eq!(embedding, vec![1.0]);
    }

    #[tokio::test]
    async fn http_provider_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(server.uri(), "test-model", 1, &fast_retry_config());
        let result = provider.embed("bad request").await;
        assert!(matches!(result, Err(EngineError::EmbeddingFailure(_))));
    }

    #[tokio::test]
    async fn http_provider_exhausts_retries_on_persistent_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(server.uri(), "test-model", 1, &fast_retry_config());
        let result = provider.embed("always fails").await;
        assert!(matches!(result, Err(EngineError::EmbeddingFailure(_))));
    }

    #[tokio::test]
    async fn mock_embeddings_are_deterministic_and_normalized() {
        let provider = MockEmbeddingProvider::new(16);
        let a = provider.embed("hello world").await.unwrap();
        let b = provider.embed("hello world").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn mock_embeddings_differ_for_different_text() {
        let provider = MockEmbeddingProvider::new(16);
        let a = provider.embed("hello").await.unwrap();
        let b = provider.embed("goodbye").await.unwrap();
        assert_ne!(a, b);
    }
}
