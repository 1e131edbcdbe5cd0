//! Atomic replacement of the on-disk index.
//!
//! A new index is written to a sibling temporary file and renamed over the
//! live one on commit. Readers never observe a half-built index, and a build
//! that fails or is dropped leaves the previous index untouched.

use crate::index;
use crate::types::{IndexMeta, IndexStats, KnowledgeChunk, KnowledgeSource};
use itt_core::{AppError, AppResult};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes a complete index next to `target` and swaps it in on [`commit`].
///
/// [`commit`]: IndexBuilder::commit
pub struct IndexBuilder {
    target: PathBuf,
    temp_path: PathBuf,
    conn: Option<Connection>,
}

impl IndexBuilder {
    /// Start a new build for `target`. A stale temporary file from an
    /// interrupted build is discarded.
    pub fn create(target: &Path) -> AppResult<Self> {
        let temp_path = temp_path_for(target);
        if temp_path.exists() {
            tracing::warn!("Removing stale index build at {:?}", temp_path);
            fs::remove_file(&temp_path)?;
        }

        let conn = index::init_index(&temp_path)?;
        conn.execute_batch("BEGIN")
            .map_err(|e| AppError::Knowledge(format!("Failed to begin index build: {}", e)))?;

        Ok(Self {
            target: target.to_path_buf(),
            temp_path,
            conn: Some(conn),
        })
    }

    fn conn(&self) -> AppResult<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| AppError::Knowledge("Index build already finished".to_string()))
    }

    pub fn add_source(&self, source: &KnowledgeSource) -> AppResult<()> {
        index::insert_source(self.conn()?, source)
    }

    pub fn add_chunk(&self, chunk: &KnowledgeChunk) -> AppResult<()> {
        index::insert_chunk(self.conn()?, chunk)
    }

    /// Record `meta`, flush, and atomically replace the live index.
    pub fn commit(mut self, meta: &IndexMeta) -> AppResult<()> {
        let conn = self
            .conn
            .take()
            .ok_or_else(|| AppError::Knowledge("Index build already finished".to_string()))?;

        index::write_meta(&conn, meta)?;
        conn.execute_batch("COMMIT")
            .map_err(|e| AppError::Knowledge(format!("Failed to commit index build: {}", e)))?;
        conn.close()
            .map_err(|(_, e)| AppError::Knowledge(format!("Failed to close index build: {}", e)))?;

        fs::rename(&self.temp_path, &self.target).map_err(|e| {
            AppError::Knowledge(format!(
                "Failed to move new index into place at {:?}: {}",
                self.target, e
            ))
        })?;

        tracing::info!("Index swapped in at {:?}", self.target);
        Ok(())
    }
}

impl Drop for IndexBuilder {
    fn drop(&mut self) {
        // Not committed: discard the partial build
        if let Some(conn) = self.conn.take() {
            drop(conn);
            if let Err(e) = fs::remove_file(&self.temp_path) {
                tracing::debug!("Could not remove partial index {:?}: {}", self.temp_path, e);
            }
        }
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "index".into());
    name.push(".building");
    target.with_file_name(name)
}

/// Statistics of the index at `path`, or `None` when no index exists yet.
pub fn index_stats(path: &Path) -> AppResult<Option<IndexStats>> {
    if !path.exists() {
        return Ok(None);
    }

    let conn = index::open_read_only(path)?;
    let (sources_count, chunks_count) = index::get_stats(&conn)?;
    let meta = index::read_meta(&conn)?;
    let db_size_bytes = fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    Ok(Some(IndexStats {
        sources_count,
        chunks_count,
        db_size_bytes,
        meta,
    }))
}
