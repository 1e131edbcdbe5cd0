//! Knowledge base configuration derived from application settings.

use crate::chunk::ChunkConfig;
use itt_core::config::KnowledgeSettings;
use std::path::PathBuf;

/// Retrieval parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// Maximum number of chunks returned per query
    pub top_k: usize,

    /// Minimum cosine similarity (inclusive) for a chunk to be returned
    pub score_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            score_threshold: 0.3,
        }
    }
}

/// Paths and chunking parameters for one knowledge base.
#[derive(Debug, Clone)]
pub struct KnowledgeBaseConfig {
    /// Single-file index that retrieval reads and refreshes replace
    pub index_path: PathBuf,

    /// Folder documents are staged in before ingestion
    pub data_path: PathBuf,

    pub chunk: ChunkConfig,

    pub retrieval: RetrievalConfig,
}

impl From<&KnowledgeSettings> for KnowledgeBaseConfig {
    fn from(settings: &KnowledgeSettings) -> Self {
        Self {
            index_path: settings.index_path.clone(),
            data_path: settings.data_path.clone(),
            chunk: ChunkConfig {
                chunk_size: settings.chunk_size,
                chunk_overlap: settings.chunk_overlap,
            },
            retrieval: RetrievalConfig {
                top_k: settings.top_k.max(1),
                score_threshold: settings.score_threshold,
            },
        }
    }
}
