//! Chunking of extracted documents into overlapping spans.
//!
//! Splitting prefers semantic boundaries (paragraph, then line, then word,
//! then character) and never produces a chunk longer than the configured
//! size in characters.

mod metadata;
mod pipeline;

pub use metadata::calculate_hash;
pub use pipeline::{ChunkConfig, ChunkPipeline};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chunk produced by the pipeline, before embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier (UUID v4)
    pub id: String,

    /// Source document identifier
    pub source_id: String,

    /// Chunk position in the document (0-indexed, continuous across pages)
    pub position: u32,

    /// Chunk text content
    pub text: String,

    pub metadata: ChunkMetadata,
}

/// Metadata about a chunk's origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// File name of the source document
    pub source_name: String,

    /// 1-based page number
    pub page: u32,

    /// Byte range within the page text
    pub byte_range: (usize, usize),

    pub char_count: usize,

    /// SHA-256 hash of chunk text
    pub hash: String,

    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a new chunk with generated ID and timestamp.
    pub fn new(
        source_id: &str,
        source_name: &str,
        position: u32,
        page: u32,
        text: &str,
        byte_range: (usize, usize),
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_id: source_id.to_string(),
            position,
            text: text.to_string(),
            metadata: ChunkMetadata {
                source_name: source_name.to_string(),
                page,
                byte_range,
                char_count: text.chars().count(),
                hash: calculate_hash(text),
                created_at: Utc::now(),
            },
        }
    }
}
