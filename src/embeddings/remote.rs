//! Remote embedding service
//!
//! Client for an OpenAI-style `/embeddings` endpoint. Handles rate
//! limiting with bounded exponential backoff and validates returned
//! vectors before they reach similarity math.

use crate::embeddings::TextEmbedder;
use crate::error::{Result, TariffsenseError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Embedding dimension for the default model (text-embedding-3-small)
pub const REMOTE_EMBEDDING_DIM: usize = 1536;

/// Maximum retry attempts for rate limiting and timeouts
const MAX_RETRIES: usize = 3;

/// Backoff base duration in milliseconds
const BACKOFF_BASE_MS: u64 = 500;

/// Request timeout duration
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP embedding service client
pub struct RemoteEmbedder {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: Vec<&'a str>,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl RemoteEmbedder {
    /// Create a new remote embedder
    ///
    /// # Arguments
    /// * `api_key` - API key for the embedding service
    /// * `model` - Model name (defaults to "text-embedding-3-small")
    /// * `base_url` - API base URL (defaults to the OpenAI endpoint)
    pub fn new(api_key: String, model: Option<String>, base_url: Option<String>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(TariffsenseError::InvalidInput(
                "API key cannot be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TariffsenseError::Network(e.to_string()))?;

        let model = model.unwrap_or_else(|| "text-embedding-3-small".to_string());
        let base_url = base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client,
            api_key,
            model,
            base_url,
            dimensions: REMOTE_EMBEDDING_DIM,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Call the API with retry on rate limiting and timeouts
    async fn call_api_with_retry(&self, text: &str) -> Result<EmbeddingResponse> {
        let mut retries = 0;

        loop {
            match self.call_api(text).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if retries >= MAX_RETRIES {
                        return Err(e);
                    }

                    let should_retry = match &e {
                        TariffsenseError::RateLimit(_) => true,
                        TariffsenseError::Network(msg) if msg.contains("timed out") => true,
                        _ => false,
                    };

                    if !should_retry {
                        return Err(e);
                    }

                    let backoff_ms = BACKOFF_BASE_MS * 2_u64.pow(retries as u32);
                    warn!(
                        "Embedding API call failed, retrying after {}ms (attempt {}/{}): {}",
                        backoff_ms,
                        retries + 1,
                        MAX_RETRIES,
                        e
                    );

                    sleep(Duration::from_millis(backoff_ms)).await;
                    retries += 1;
                }
            }
        }
    }

    /// Call the API once (no retry)
    async fn call_api(&self, text: &str) -> Result<EmbeddingResponse> {
        debug!(
            "Calling embedding API: {} chars, model: {}",
            text.len(),
            self.model
        );

        let request = EmbeddingRequest {
            input: vec![text],
            model: &self.model,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| TariffsenseError::Network(e.to_string()))?;

        let status = response.status();

        match status {
            StatusCode::OK => response
                .json::<EmbeddingResponse>()
                .await
                .map_err(|e| TariffsenseError::Embedding(e.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(TariffsenseError::Authentication(
                    "Invalid or missing API key".to_string(),
                ))
            }
            StatusCode::TOO_MANY_REQUESTS => Err(TariffsenseError::RateLimit(
                "Embedding service rate limit exceeded".to_string(),
            )),
            StatusCode::BAD_REQUEST => {
                let error_msg = if let Ok(error_response) =
                    response.json::<ApiErrorResponse>().await
                {
                    error_response
                        .error
                        .map(|e| e.message)
                        .unwrap_or_else(|| "Bad request".to_string())
                } else {
                    "Bad request".to_string()
                };

                Err(TariffsenseError::Embedding(error_msg))
            }
            _ => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());

                Err(TariffsenseError::Embedding(format!(
                    "API error (status {}): {}",
                    status, error_text
                )))
            }
        }
    }

    /// Validate a returned embedding before it enters similarity math
    fn validate_embedding(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(TariffsenseError::Embedding(format!(
                "Expected {} dimensions, got {}",
                self.dimensions,
                embedding.len()
            )));
        }

        if embedding.iter().any(|&x| !x.is_finite()) {
            return Err(TariffsenseError::Embedding(
                "Embedding contains invalid values (NaN or Inf)".to_string(),
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl TextEmbedder for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(TariffsenseError::InvalidInput(
                "Text cannot be empty".to_string(),
            ));
        }

        let response = self.call_api_with_retry(text).await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| {
                TariffsenseError::Embedding("Empty response from API".to_string())
            })?
            .embedding;

        self.validate_embedding(&embedding)?;

        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_creation() {
        let embedder = RemoteEmbedder::new(
            "test-key".to_string(),
            Some("text-embedding-3-small".to_string()),
            None,
        );

        assert!(embedder.is_ok());
        let embedder = embedder.unwrap();
        assert_eq!(embedder.dimensions(), REMOTE_EMBEDDING_DIM);
        assert_eq!(embedder.model_name(), "text-embedding-3-small");
    }

    #[test]
    fn test_empty_api_key_error() {
        let result = RemoteEmbedder::new("".to_string(), None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_embedding() {
        let embedder = RemoteEmbedder::new("test-key".to_string(), None, None).unwrap();

        let valid = vec![0.5; REMOTE_EMBEDDING_DIM];
        assert!(embedder.validate_embedding(&valid).is_ok());

        let wrong_dims = vec![0.5; 512];
        assert!(embedder.validate_embedding(&wrong_dims).is_err());

        let mut nan_embedding = vec![0.5; REMOTE_EMBEDDING_DIM];
        nan_embedding[0] = f32::NAN;
        assert!(embedder.validate_embedding(&nan_embedding).is_err());

        let mut inf_embedding = vec![0.5; REMOTE_EMBEDDING_DIM];
        inf_embedding[0] = f32::INFINITY;
        assert!(embedder.validate_embedding(&inf_embedding).is_err());
    }

    #[tokio::test]
    async fn test_empty_text_rejected_before_network() {
        let embedder = RemoteEmbedder::new("test-key".to_string(), None, None).unwrap();
        let result = embedder.embed("  ").await;
        assert!(matches!(result, Err(TariffsenseError::InvalidInput(_))));
    }

    // Integration tests (require API key)
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_embed_single_text() {
        let api_key = std::env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY not set");
        let embedder = RemoteEmbedder::new(api_key, None, None).unwrap();

        let embedding = embedder.embed("genuine leather handbag").await.unwrap();
        assert_eq!(embedding.len(), REMOTE_EMBEDDING_DIM);
    }

    #[tokio::test]
    #[ignore]
    async fn test_invalid_api_key() {
        let embedder = RemoteEmbedder::new("invalid-key".to_string(), None, None).unwrap();

        let result = embedder.embed("test text").await;
        match result.unwrap_err() {
            TariffsenseError::Authentication(_) => (),
            other => panic!("Expected Authentication error, got {:?}", other),
        }
    }
}
