//! Embedding provider implementations.

pub mod gemini;
pub mod hash;
pub mod ollama;

pub use gemini::GeminiEmbeddingProvider;
pub use hash::HashEmbeddingProvider;
pub use ollama::OllamaProvider;

use itt_core::AppResult;
use std::future::Future;
use std::time::Duration;

/// Maximum attempts for a failed embedding request
pub(crate) const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 100;

/// Request timeout in seconds
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Run `op` up to `MAX_RETRIES` times with exponential backoff.
pub(crate) async fn with_retries<T, F, Fut>(label: &str, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= MAX_RETRIES {
                    return Err(e);
                }
                let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}), retrying in {}ms: {}",
                    label,
                    attempt,
                    MAX_RETRIES,
                    backoff_ms,
                    e
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }
    }
}

/// Check a provider returned one vector of the expected size per input.
pub(crate) fn check_embeddings(
    provider: &str,
    expected_count: usize,
    dimensions: usize,
    embeddings: &[Vec<f32>],
) -> AppResult<()> {
    if embeddings.len() != expected_count {
        return Err(itt_core::AppError::Llm(format!(
            "{} returned {} embeddings for {} inputs",
            provider,
            embeddings.len(),
            expected_count
        )));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
        return Err(itt_core::AppError::Llm(format!(
            "Unexpected embedding dimensions from {}: got {}, expected {}",
            provider,
            bad.len(),
            dimensions
        )));
    }
    Ok(())
}
