//! Folder ingestion: parse, chunk, embed, and atomically rebuild the index.

use crate::chunk::{Chunk, ChunkConfig, ChunkPipeline};
use crate::embeddings::EmbeddingProvider;
use crate::parser::{ContentType, ParserRegistry};
use crate::progress::{Phase, ProgressReporter};
use crate::store::IndexBuilder;
use crate::types::{IndexMeta, IngestOutcome, IngestStats, KnowledgeChunk, KnowledgeSource};
use chrono::Utc;
use itt_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// Builds a fresh index from every supported document in a folder.
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingProvider>,
    pipeline: ChunkPipeline,
    parsers: Arc<ParserRegistry>,
    index_path: PathBuf,
    progress: ProgressReporter,
}

/// A parsed document and its chunks, waiting for embeddings.
struct PendingSource {
    source: KnowledgeSource,
    chunks: Vec<Chunk>,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        chunk_config: ChunkConfig,
        index_path: impl Into<PathBuf>,
    ) -> AppResult<Self> {
        Ok(Self {
            embedder,
            pipeline: ChunkPipeline::new(chunk_config)?,
            parsers: Arc::new(ParserRegistry::default()),
            index_path: index_path.into(),
            progress: ProgressReporter::noop(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Ingest every supported document directly inside `folder`.
    ///
    /// Unreadable documents are logged and counted, never fatal. When no
    /// document yields any text the existing index is left as it was and
    /// [`IngestOutcome::NoDocuments`] is returned.
    pub async fn ingest_folder(&self, folder: &Path) -> AppResult<IngestOutcome> {
        let start = Instant::now();
        tracing::info!("Starting ingestion from {:?}", folder);

        let files = self.discover(folder);
        let total = files.len() as u64;
        let mut stats = IngestStats::default();
        let mut pending = Vec::new();

        for (i, path) in files.into_iter().enumerate() {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            self.progress
                .emit(Phase::Parse, i as u64 + 1, Some(total), format!("reading {}", file_name));

            match self.load_document(&path, &file_name).await {
                Ok(Some(doc)) => {
                    stats.documents_loaded += 1;
                    stats.bytes_processed += doc.source.size_bytes;
                    stats.chunks_count += doc.chunks.len() as u32;
                    pending.push(doc);
                }
                Ok(None) => {
                    tracing::warn!("No text extracted from {}, skipping", file_name);
                    stats.documents_failed += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to load {}: {}", file_name, e);
                    stats.documents_failed += 1;
                }
            }
        }

        if stats.chunks_count == 0 {
            stats.duration_secs = start.elapsed().as_secs_f64();
            tracing::warn!(
                "No documents with text found in {:?}; keeping the current index",
                folder
            );
            return Ok(IngestOutcome::NoDocuments(stats));
        }

        let texts: Vec<String> = pending
            .iter()
            .flat_map(|doc| doc.chunks.iter().map(|c| c.text.clone()))
            .collect();
        self.progress.emit(
            Phase::Embed,
            0,
            Some(texts.len() as u64),
            format!("model={}", self.embedder.model_name()),
        );
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(AppError::Knowledge(format!(
                "Embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                texts.len()
            )));
        }
        self.progress.emit(
            Phase::Embed,
            texts.len() as u64,
            Some(texts.len() as u64),
            format!("model={}", self.embedder.model_name()),
        );

        let meta = IndexMeta {
            embedding_provider: self.embedder.provider_name().to_string(),
            embedding_model: self.embedder.model_name().to_string(),
            dimensions: self.embedder.dimensions(),
            chunk_size: self.pipeline.config().chunk_size,
            chunk_overlap: self.pipeline.config().chunk_overlap,
            built_at: Utc::now(),
        };

        self.progress.emit(
            Phase::Index,
            0,
            Some(texts.len() as u64),
            format!("writing {:?}", self.index_path),
        );
        let index_path = self.index_path.clone();
        tokio::task::spawn_blocking(move || write_index(&index_path, pending, embeddings, &meta))
            .await
            .map_err(|e| AppError::Knowledge(format!("Index build task failed: {}", e)))??;

        stats.duration_secs = start.elapsed().as_secs_f64();
        tracing::info!(
            "Ingestion completed: {} documents ({} skipped), {} chunks, {} bytes in {:.2}s",
            stats.documents_loaded,
            stats.documents_failed,
            stats.chunks_count,
            stats.bytes_processed,
            stats.duration_secs
        );

        Ok(IngestOutcome::Indexed(stats))
    }

    fn discover(&self, folder: &Path) -> Vec<PathBuf> {
        if !folder.is_dir() {
            tracing::warn!("Document folder {:?} does not exist", folder);
            return Vec::new();
        }

        // Subdirectories are not part of the document set
        WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && self.parsers.supports(p))
            .collect()
    }

    async fn load_document(&self, path: &Path, file_name: &str) -> AppResult<Option<PendingSource>> {
        let parsers = self.parsers.clone();
        let owned_path = path.to_path_buf();
        let parsed = tokio::task::spawn_blocking(move || parsers.parse(&owned_path))
            .await
            .map_err(|e| AppError::Knowledge(format!("Parser task failed: {}", e)))??;

        if parsed.is_empty() {
            return Ok(None);
        }

        let source = KnowledgeSource {
            id: uuid::Uuid::new_v4().to_string(),
            path: path.to_path_buf(),
            file_name: file_name.to_string(),
            content_type: ContentType::from_path(path).as_str().to_string(),
            page_count: parsed.pages.len() as u32,
            size_bytes: parsed.size_bytes(),
            learned_at: Utc::now(),
        };

        let chunks = self.pipeline.process(&source.id, file_name, &parsed)?;
        self.progress
            .emit(Phase::Chunk, chunks.len() as u64, None, format!("{} chunked", file_name));

        if chunks.is_empty() {
            return Ok(None);
        }

        Ok(Some(PendingSource { source, chunks }))
    }
}

fn write_index(
    index_path: &Path,
    pending: Vec<PendingSource>,
    embeddings: Vec<Vec<f32>>,
    meta: &IndexMeta,
) -> AppResult<()> {
    let builder = IndexBuilder::create(index_path)?;
    let mut embeddings = embeddings.into_iter();

    for doc in pending {
        builder.add_source(&doc.source)?;
        for chunk in doc.chunks {
            let embedding = embeddings
                .next()
                .ok_or_else(|| AppError::Knowledge("Missing embedding for chunk".to_string()))?;
            builder.add_chunk(&KnowledgeChunk {
                metadata: serde_json::to_value(&chunk.metadata)?,
                page: Some(chunk.metadata.page),
                id: chunk.id,
                source_id: chunk.source_id,
                position: chunk.position,
                text: chunk.text,
                embedding: Some(embedding),
            })?;
        }
    }

    builder.commit(meta)
}
