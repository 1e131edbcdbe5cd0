//! SQLite-backed vector index for knowledge chunks.
//!
//! Embeddings are stored as little-endian `f32` blobs and scored with an
//! exhaustive cosine scan, which is plenty for a handful of bylaw PDFs.

use crate::types::{IndexMeta, KnowledgeChunk, KnowledgeSource, RetrievedChunk};
use itt_core::{AppError, AppResult};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

const META_KEY: &str = "index";

/// Create (or open) an index database and its tables.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sources (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            file_name TEXT NOT NULL,
            content_type TEXT NOT NULL,
            page_count INTEGER NOT NULL,
            size_bytes INTEGER NOT NULL,
            learned_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            source_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            page INTEGER,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata TEXT,
            FOREIGN KEY (source_id) REFERENCES sources(id)
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
        "#,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Open an existing index for queries.
pub fn open_read_only(db_path: &Path) -> AppResult<Connection> {
    Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index {:?}: {}", db_path, e)))
}

/// Record the parameters the index was built with.
pub fn write_meta(conn: &Connection, meta: &IndexMeta) -> AppResult<()> {
    let json = serde_json::to_string(meta)?;
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![META_KEY, json],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to write index metadata: {}", e)))?;
    Ok(())
}

/// Read the build parameters, if recorded.
pub fn read_meta(conn: &Connection) -> AppResult<Option<IndexMeta>> {
    let json: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![META_KEY],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| AppError::Knowledge(format!("Failed to read index metadata: {}", e)))?;

    json.map(|j| serde_json::from_str(&j).map_err(AppError::from))
        .transpose()
}

/// Insert a source into the index.
pub fn insert_source(conn: &Connection, source: &KnowledgeSource) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO sources (id, path, file_name, content_type, page_count, size_bytes, learned_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            source.id,
            source.path.to_string_lossy().to_string(),
            source.file_name,
            source.content_type,
            source.page_count as i64,
            source.size_bytes as i64,
            source.learned_at.to_rfc3339(),
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert source: {}", e)))?;

    Ok(())
}

/// Insert a chunk with embedding into the index.
pub fn insert_chunk(conn: &Connection, chunk: &KnowledgeChunk) -> AppResult<()> {
    let embedding_bytes = embedding_to_bytes(
        chunk
            .embedding
            .as_ref()
            .ok_or_else(|| AppError::Knowledge("Chunk missing embedding".to_string()))?,
    );

    let metadata_json = serde_json::to_string(&chunk.metadata)?;

    conn.execute(
        "INSERT OR REPLACE INTO chunks (id, source_id, position, page, text, embedding, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            chunk.id,
            chunk.source_id,
            chunk.position as i64,
            chunk.page.map(|p| p as i64),
            chunk.text,
            embedding_bytes,
            metadata_json,
        ],
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;

    Ok(())
}

/// Score every chunk against `query_embedding` and return at most `top_k`
/// with a score of at least `min_score`, best first.
///
/// Ties keep insertion order, so results are stable across runs.
pub fn query_chunks(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
    min_score: f32,
) -> AppResult<Vec<RetrievedChunk>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, source_id, position, page, text, embedding, metadata
             FROM chunks ORDER BY rowid",
        )
        .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(5)?;
            let metadata_json: Option<String> = row.get(6)?;
            Ok((
                KnowledgeChunk {
                    id: row.get(0)?,
                    source_id: row.get(1)?,
                    position: row.get::<_, i64>(2)? as u32,
                    page: row.get::<_, Option<i64>>(3)?.map(|p| p as u32),
                    text: row.get(4)?,
                    embedding: None,
                    metadata: serde_json::Value::Null,
                },
                embedding_bytes,
                metadata_json,
            ))
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        let (mut chunk, embedding_bytes, metadata_json) =
            row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk: {}", e)))?;

        let embedding = bytes_to_embedding(&embedding_bytes)?;
        let score = cosine_similarity(query_embedding, &embedding);
        if score < min_score {
            continue;
        }

        if let Some(json) = metadata_json {
            chunk.metadata = serde_json::from_str(&json)?;
        }
        results.push(RetrievedChunk { chunk, score });
    }

    // Stable sort keeps insertion order among equal scores
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);

    tracing::debug!(
        "Retrieved {} chunks (top-{}, min score {:.2})",
        results.len(),
        top_k,
        min_score
    );

    Ok(results)
}

/// Count sources and chunks.
pub fn get_stats(conn: &Connection) -> AppResult<(u32, u32)> {
    let sources_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM sources", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count sources: {}", e)))?;

    let chunks_count: u32 = conn
        .query_row("SELECT COUNT(*) FROM chunks", [], |row| {
            row.get::<_, i64>(0).map(|v| v as u32)
        })
        .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))?;

    Ok((sources_count, chunks_count))
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
