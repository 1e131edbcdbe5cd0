//! Knowledge base for the bylaws assistant.
//!
//! Documents are parsed, split into overlapping chunks, embedded, and stored
//! in a single-file SQLite index. Refreshes build a complete new index and
//! swap it in atomically; retrieval scores chunks by cosine similarity.

pub mod chunk;
pub mod config;
pub mod embeddings;
pub mod index;
pub mod ingest;
pub mod parser;
pub mod progress;
pub mod refresh;
pub mod retrieval;
pub mod source;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::{KnowledgeBaseConfig, RetrievalConfig};
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use ingest::Ingestor;
pub use parser::ParserRegistry;
pub use refresh::{KnowledgeRefresher, RefreshReport, RefreshStatus};
pub use retrieval::{IndexRetriever, Retriever};
pub use source::{DocumentSource, LocalFolderSource};
pub use store::index_stats;
pub use types::{
    IndexMeta, IndexStats, IngestOutcome, IngestStats, KnowledgeChunk, KnowledgeSource,
    RetrievedChunk,
};
