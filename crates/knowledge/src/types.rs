//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A source document that contributed chunks to the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSource {
    /// Unique source identifier
    pub id: String,

    /// Local path the document was read from
    pub path: PathBuf,

    /// File name shown in logs and chunk metadata
    pub file_name: String,

    /// "pdf", "markdown" or "text"
    pub content_type: String,

    pub page_count: u32,

    /// Extracted text size in bytes
    pub size_bytes: u64,

    pub learned_at: DateTime<Utc>,
}

/// A stored chunk with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Source document ID
    pub source_id: String,

    /// Position in the split sequence of its source
    pub position: u32,

    /// 1-based page number, when the source has pages
    pub page: Option<u32>,

    /// Chunk text
    pub text: String,

    /// Embedding vector
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Chunk metadata (hash, byte range, source name)
    pub metadata: serde_json::Value,
}

/// A chunk returned by retrieval together with its cosine similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: KnowledgeChunk,
    pub score: f32,
}

/// Parameters an index was built with.
///
/// Queries must be embedded with the same model and dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub embedding_provider: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub built_at: DateTime<Utc>,
}

/// Statistics for an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// Documents that produced at least one chunk
    pub documents_loaded: u32,

    /// Documents skipped because extraction failed or yielded no text
    pub documents_failed: u32,

    pub chunks_count: u32,

    /// Extracted text bytes across loaded documents
    pub bytes_processed: u64,

    pub duration_secs: f64,
}

/// Result of an ingestion run.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// A new index replaced the previous one
    Indexed(IngestStats),

    /// Nothing usable was found; the previous index was left in place
    NoDocuments(IngestStats),
}

impl IngestOutcome {
    pub fn stats(&self) -> &IngestStats {
        match self {
            IngestOutcome::Indexed(stats) | IngestOutcome::NoDocuments(stats) => stats,
        }
    }
}

/// Counts for an existing index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub sources_count: u32,
    pub chunks_count: u32,
    pub db_size_bytes: u64,
    pub meta: Option<IndexMeta>,
}
