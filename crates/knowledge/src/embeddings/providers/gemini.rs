//! Gemini embedding provider.
//!
//! Calls `models/{model}:batchEmbedContents`. Documents are embedded with the
//! `RETRIEVAL_DOCUMENT` task type and queries with `RETRIEVAL_QUERY`.

use super::{check_embeddings, with_retries, REQUEST_TIMEOUT_SECS};
use crate::embeddings::{EmbeddingConfig, EmbeddingProvider};
use async_trait::async_trait;
use itt_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// The API accepts at most this many requests per batch call.
const MAX_BATCH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    task_type: TaskType,
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct GeminiEmbeddingProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl GeminiEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to create HTTP client for Gemini: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            model: config
                .model
                .trim_start_matches("models/")
                .to_string(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.clamp(1, MAX_BATCH),
        })
    }

    fn build_request(&self, texts: &[String], task_type: TaskType) -> BatchEmbedRequest {
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: format!("models/{}", self.model),
                    content: Content {
                        parts: vec![Part { text: text.clone() }],
                    },
                    task_type,
                    output_dimensionality: self.dimensions,
                })
                .collect(),
        }
    }

    #[instrument(skip(self, texts), fields(batch = texts.len(), model = %self.model, task = ?task_type))]
    async fn embed_request(
        &self,
        texts: &[String],
        task_type: TaskType,
    ) -> AppResult<Vec<Vec<f32>>> {
        let url = format!(
            "{}/v1beta/models/{}:batchEmbedContents",
            self.base_url, self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(texts, task_type))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to Gemini: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Llm(format!(
                "Gemini embedding error ({}): {}",
                status, error_text
            )));
        }

        let body: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        let embeddings: Vec<Vec<f32>> = body.embeddings.into_iter().map(|e| e.values).collect();
        check_embeddings("Gemini", texts.len(), self.dimensions, &embeddings)?;
        Ok(embeddings)
    }

    async fn embed_all(&self, texts: &[String], task_type: TaskType) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!("Embedding batch of {} texts", batch.len());
            let vectors =
                with_retries("Gemini embedding", || self.embed_request(batch, task_type)).await?;
            embeddings.extend(vectors);
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.embed_all(texts, TaskType::RetrievalDocument).await
    }

    async fn embed_query(&self, query: &str) -> AppResult<Vec<f32>> {
        self.embed_all(&[query.to_string()], TaskType::RetrievalQuery)
            .await?
            .pop()
            .ok_or_else(|| AppError::Llm("No embedding returned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(batch_size: usize) -> GeminiEmbeddingProvider {
        let config = EmbeddingConfig {
            provider: "gemini".to_string(),
            model: "models/gemini-embedding-001".to_string(),
            dimensions: 768,
            endpoint: None,
            batch_size,
        };
        GeminiEmbeddingProvider::new(&config, "key").unwrap()
    }

    #[test]
    fn test_model_prefix_normalized() {
        let provider = provider(64);
        assert_eq!(provider.model_name(), "gemini-embedding-001");
        assert_eq!(provider.base_url, DEFAULT_GEMINI_URL);
    }

    #[test]
    fn test_batch_size_capped() {
        assert_eq!(provider(500).batch_size, MAX_BATCH);
        assert_eq!(provider(0).batch_size, 1);
    }

    #[test]
    fn test_request_shape() {
        let request = provider(64).build_request(
            &["Art. 1º".to_string(), "Art. 2º".to_string()],
            TaskType::RetrievalQuery,
        );
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["requests"].as_array().unwrap().len(), 2);
        assert_eq!(body["requests"][0]["model"], "models/gemini-embedding-001");
        assert_eq!(body["requests"][0]["taskType"], "RETRIEVAL_QUERY");
        assert_eq!(body["requests"][0]["outputDimensionality"], 768);
        assert_eq!(body["requests"][1]["content"]["parts"][0]["text"], "Art. 2º");
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"embeddings": [{"values": [0.1, 0.2]}, {"values": [0.3, 0.4]}]}"#;
        let parsed: BatchEmbedResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[1].values, vec![0.3, 0.4]);
    }
}
