//! LLM provider factory.
//!
//! Builds the completion client named in configuration.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient};
use crate::types::ProviderType;
use itt_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("gemini", "ollama")
/// * `endpoint` - Optional custom base URL
/// * `api_key` - API key (required for Gemini)
/// * `timeout` - Per-request HTTP timeout
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown, a required key is
/// missing, or the HTTP client cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown LLM provider: {}", provider)))?;
    let base_url = endpoint.unwrap_or(provider_type.default_endpoint());

    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

    match provider_type {
        ProviderType::Gemini => {
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("Gemini provider requires GOOGLE_API_KEY".to_string())
            })?;
            Ok(Arc::new(GeminiClient::with_http(base_url, api_key, http)))
        }
        ProviderType::Ollama => Ok(Arc::new(OllamaClient::with_http(base_url, http))),
    }
}
