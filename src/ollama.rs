//! Ollama HTTP clients.
//!
//! - [`OllamaEmbedder`] calls `POST /api/embed` and implements
//!   [`EmbeddingProvider`].
//! - [`OllamaGenerator`] calls `POST /api/generate` (non-streaming) and
//!   implements [`GenerationProvider`].
//!
//! # Retry Strategy
//!
//! Embedding requests retry with exponential backoff (1s, 2s, 4s, ...)
//! on HTTP 429, 5xx and connection errors, up to `ollama.max_retries`
//! extra attempts. The default is no retries. Other 4xx responses fail
//! immediately. Generation requests are never retried.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use docroute_core::embedding::EmbeddingProvider;
use docroute_core::error::{EmbeddingError, GenerationError};
use docroute_core::generation::GenerationProvider;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::OllamaConfig;

fn http_client(config: &OllamaConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Query embeddings from a local Ollama instance.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            url: config.url.clone(),
            model: config.embedding_model().to_string(),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!(attempt, delay_secs = delay.as_secs(), "retrying Ollama embedding");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/api/embed", self.url))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response
                            .json()
                            .await
                            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;
                        return parse_embed_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = EmbeddingError::Request(format!(
                        "Ollama API error {}: {}",
                        status, body_text
                    ));
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    last_err = Some(EmbeddingError::Request(format!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url, e
                    )));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            EmbeddingError::Request("Ollama embedding failed after retries".to_string())
        }))
    }
}

/// First vector of an `/api/embed` response.
pub fn parse_embed_response(json: &Value) -> Result<Vec<f32>, EmbeddingError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| EmbeddingError::InvalidResponse("missing embeddings array".to_string()))?;

    let first = match embeddings.first() {
        Some(first) => first,
        None => return Err(EmbeddingError::Empty),
    };

    let vector: Vec<f32> = first
        .as_array()
        .ok_or_else(|| EmbeddingError::InvalidResponse("embedding is not an array".to_string()))?
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect();

    if vector.is_empty() {
        return Err(EmbeddingError::Empty);
    }
    Ok(vector)
}

/// Answer generation with a local Ollama model.
pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    max_tokens: Option<u32>,
}

impl OllamaGenerator {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            url: config.url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["options"] = serde_json::json!({ "num_predict": max_tokens });
        }
        body
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "calling Ollama generate");

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                GenerationError::Request(format!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Request(format!(
                "Ollama API error {}: {}",
                status, body_text
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        parse_generate_response(&json)
    }
}

/// The `response` field of a non-streaming `/api/generate` reply.
pub fn parse_generate_response(json: &Value) -> Result<String, GenerationError> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(str::to_string)
        .ok_or_else(|| GenerationError::InvalidResponse("missing response field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_embed_response_takes_first_vector() {
        let json = json!({ "embeddings": [[0.5, -1.0, 2.0], [9.0]] });
        assert_eq!(parse_embed_response(&json).unwrap(), vec![0.5, -1.0, 2.0]);
    }

    #[test]
    fn test_parse_embed_response_errors() {
        assert!(matches!(
            parse_embed_response(&json!({})),
            Err(EmbeddingError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_embed_response(&json!({ "embeddings": [] })),
            Err(EmbeddingError::Empty)
        ));
        assert!(matches!(
            parse_embed_response(&json!({ "embeddings": [[]] })),
            Err(EmbeddingError::Empty)
        ));
    }

    #[test]
    fn test_parse_generate_response() {
        let json = json!({ "model": "llama2", "response": "Hello", "done": true });
        assert_eq!(parse_generate_response(&json).unwrap(), "Hello");
        assert!(parse_generate_response(&json!({ "done": true })).is_err());
    }

    #[test]
    fn test_request_body_sets_num_predict() {
        let config = OllamaConfig {
            max_tokens: Some(256),
            ..OllamaConfig::default()
        };
        let generator = OllamaGenerator::new(&config).unwrap();
        let body = generator.request_body("hi");
        assert_eq!(body["options"]["num_predict"], 256);
        assert_eq!(body["stream"], false);

        let generator = OllamaGenerator::new(&OllamaConfig::default()).unwrap();
        assert!(generator.request_body("hi").get("options").is_none());
    }

    #[test]
    fn test_embedding_model_defaults_to_model() {
        let embedder = OllamaEmbedder::new(&OllamaConfig::default()).unwrap();
        assert_eq!(embedder.model_name(), "llama2");
    }
}
