//! Knowledge refresh: fetch documents from the source, then re-ingest.

use crate::ingest::Ingestor;
use crate::source::DocumentSource;
use crate::types::{IngestOutcome, IngestStats};
use itt_core::AppResult;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const REFRESH_SUCCESS_MESSAGE: &str = "Base de conhecimento atualizada com sucesso!";
pub const REFRESH_SKIPPED_MESSAGE: &str =
    "Nenhum documento encontrado. O índice não foi atualizado.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    /// A new index is live
    Success,
    /// Nothing to index; the previous index is still live
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub status: RefreshStatus,
    pub message: String,
    /// Files the source placed in the staging folder
    pub documents_fetched: usize,
    pub stats: IngestStats,
}

/// Runs refreshes one at a time.
pub struct KnowledgeRefresher {
    source: Arc<dyn DocumentSource>,
    ingestor: Ingestor,
    staging_dir: PathBuf,
    lock: Mutex<()>,
}

impl KnowledgeRefresher {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        ingestor: Ingestor,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            ingestor,
            staging_dir: staging_dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Fetch the current documents and rebuild the index from them.
    ///
    /// Concurrent calls queue behind the one in progress. Queries keep being
    /// served from the previous index until the new one is swapped in.
    pub async fn refresh(&self) -> AppResult<RefreshReport> {
        let _guard = self.lock.lock().await;

        tracing::info!("Refreshing knowledge base from source '{}'", self.source.name());
        let fetched = self.source.fetch(&self.staging_dir).await?;
        tracing::info!("Source '{}' provided {} files", self.source.name(), fetched.len());

        let report = match self.ingestor.ingest_folder(&self.staging_dir).await? {
            IngestOutcome::Indexed(stats) => RefreshReport {
                status: RefreshStatus::Success,
                message: REFRESH_SUCCESS_MESSAGE.to_string(),
                documents_fetched: fetched.len(),
                stats,
            },
            IngestOutcome::NoDocuments(stats) => RefreshReport {
                status: RefreshStatus::Skipped,
                message: REFRESH_SKIPPED_MESSAGE.to_string(),
                documents_fetched: fetched.len(),
                stats,
            },
        };

        Ok(report)
    }
}
