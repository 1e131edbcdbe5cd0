//! Semantic retrieval over the persisted index.

use crate::config::RetrievalConfig;
use crate::embeddings::EmbeddingProvider;
use crate::index;
use crate::types::RetrievedChunk;
use async_trait::async_trait;
use itt_core::{AppError, AppResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;

/// Finds the stored chunks most relevant to a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// At most `top_k` chunks scoring at least the threshold, best first.
    /// An index with no matching chunk yields an empty list.
    async fn retrieve(&self, query: &str) -> AppResult<Vec<RetrievedChunk>>;
}

/// Retriever backed by the single-file SQLite index.
///
/// The index is opened per query, so a refresh that swaps the file is
/// picked up by the next call without restarting.
pub struct IndexRetriever {
    index_path: PathBuf,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl IndexRetriever {
    pub fn new(
        index_path: impl Into<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index_path: index_path.into(),
            embedder,
            config,
        }
    }
}

#[async_trait]
impl Retriever for IndexRetriever {
    #[instrument(skip(self, query), fields(top_k = self.config.top_k))]
    async fn retrieve(&self, query: &str) -> AppResult<Vec<RetrievedChunk>> {
        if !self.index_path.exists() {
            return Err(AppError::Config(format!(
                "Knowledge index not found at {:?}. Run a knowledge sync first.",
                self.index_path
            )));
        }

        let query_embedding = self.embedder.embed_query(query).await?;

        let path = self.index_path.clone();
        let config = self.config.clone();
        let dimensions = self.embedder.dimensions();
        let model = self.embedder.model_name().to_string();

        let results = tokio::task::spawn_blocking(move || -> AppResult<Vec<RetrievedChunk>> {
            let conn = index::open_read_only(&path)?;

            if let Some(meta) = index::read_meta(&conn)? {
                if meta.dimensions != dimensions {
                    return Err(AppError::Config(format!(
                        "Index was built with {}-dimensional embeddings ({}), but the configured model produces {}. Re-sync the knowledge base.",
                        meta.dimensions, meta.embedding_model, dimensions
                    )));
                }
                if meta.embedding_model != model {
                    tracing::warn!(
                        "Index was built with embedding model '{}', querying with '{}'",
                        meta.embedding_model,
                        model
                    );
                }
            }

            index::query_chunks(&conn, &query_embedding, config.top_k, config.score_threshold)
        })
        .await
        .map_err(|e| AppError::Knowledge(format!("Retrieval task failed: {}", e)))??;

        match (results.first(), results.last()) {
            (Some(best), Some(worst)) => tracing::info!(
                "Retrieved {} relevant chunks (top score: {:.3}, lowest: {:.3})",
                results.len(),
                best.score,
                worst.score
            ),
            _ => tracing::info!(
                "No relevant chunks found (all scores below {:.2} threshold)",
                self.config.score_threshold
            ),
        }

        Ok(results)
    }
}
