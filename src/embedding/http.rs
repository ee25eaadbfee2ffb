//! HTTP embedding backend for OpenAI-compatible APIs
//!
//! Works with the OpenAI API, Azure OpenAI, and local servers exposing the
//! same `/v1/embeddings` shape (LM Studio, vLLM, Ollama in compat mode,
//! text-embeddings-inference).

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EmbeddingConfig;
use crate::types::Embedding;

use super::{EmbedError, Embedder};

/// OpenAI-compatible embedding backend
#[derive(Debug)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    encoding_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl HttpEmbedder {
    /// Build the backend from configuration. The API key comes from config
    /// or the `OPENAI_API_KEY` environment variable.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbedError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());

        if let Some(key) = &api_key {
            let auth_value = format!("Bearer {}", key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| EmbedError::Config(format!("invalid API key format: {}", e)))?,
            );
        } else if config.endpoint.contains("openai.com") || config.endpoint.contains("azure.com") {
            warn!("no API key configured for {}", config.endpoint);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EmbedError::Config(format!("failed to build HTTP client: {}", e)))?;

        info!(
            "embedding backend ready: endpoint={}, model={}, {} dimensions",
            config.endpoint, config.model, config.dimensions
        );

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            // Only OpenAI text-embedding-3-* accepts a dimensions override.
            dimensions: self
                .model
                .contains("text-embedding-3")
                .then_some(self.dimensions),
            encoding_format: "float",
        };

        debug!(
            "requesting embeddings for {} texts from {}",
            texts.len(),
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbedError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Request(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::Malformed(e.to_string()))?;

        vectors_in_order(parsed, texts.len())
    }
}

/// Sort response rows by index and check the count matches the request.
fn vectors_in_order(
    response: EmbeddingResponse,
    expected: usize,
) -> Result<Vec<Embedding>, EmbedError> {
    let mut data = response.data;
    if data.len() != expected {
        return Err(EmbedError::Malformed(format!(
            "expected {} vectors, got {}",
            expected,
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_rows_are_reordered_by_index() {
        let response = EmbeddingResponse {
            data: vec![
                EmbeddingData {
                    embedding: vec![1.0],
                    index: 1,
                },
                EmbeddingData {
                    embedding: vec![0.0],
                    index: 0,
                },
            ],
        };
        let vectors = vectors_in_order(response, 2).unwrap();
        assert_eq!(vectors, vec![vec![0.0], vec![1.0]]);
    }

    #[test]
    fn count_mismatch_is_malformed() {
        let response = EmbeddingResponse {
            data: vec![EmbeddingData {
                embedding: vec![0.5],
                index: 0,
            }],
        };
        assert!(matches!(
            vectors_in_order(response, 3),
            Err(EmbedError::Malformed(_))
        ));
    }

    #[test]
    fn response_json_shape_parses() {
        let json = r#"{"data":[{"embedding":[0.1,0.2],"index":0}],"model":"text-embedding-3-small","usage":{"prompt_tokens":2,"total_tokens":2}}"#;
        let parsed: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].embedding, vec![0.1, 0.2]);
    }
}
