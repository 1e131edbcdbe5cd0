//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::{GeminiEmbeddingProvider, HashEmbeddingProvider, OllamaProvider};
use itt_core::{AppError, AppResult};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "gemini", "ollama", "hash")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Embed document texts, one vector per input in the same order.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single document text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Llm("No embedding returned".to_string()))
    }

    /// Embed a search query. Providers with query-specific task types
    /// override this.
    async fn embed_query(&self, query: &str) -> AppResult<Vec<f32>> {
        self.embed(query).await
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(
    config: &EmbeddingConfig,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hash" => Ok(Arc::new(HashEmbeddingProvider::new(config.dimensions))),

        "gemini" => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("Gemini embeddings require GOOGLE_API_KEY".to_string())
            })?;
            Ok(Arc::new(GeminiEmbeddingProvider::new(config, api_key)?))
        }

        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),

        _ => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: gemini, ollama, hash",
            config.provider
        ))),
    }
}
