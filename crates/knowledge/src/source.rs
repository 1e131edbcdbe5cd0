//! Where documents come from before ingestion.

use async_trait::async_trait;
use itt_core::{AppError, AppResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Materializes the current set of source documents into a local folder.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Short name for logs, e.g. "google-drive".
    fn name(&self) -> &str;

    /// Populate `staging_dir` and return the files it now holds.
    async fn fetch(&self, staging_dir: &Path) -> AppResult<Vec<PathBuf>>;
}

/// Uses whatever is already in the staging folder.
#[derive(Debug, Default, Clone)]
pub struct LocalFolderSource;

#[async_trait]
impl DocumentSource for LocalFolderSource {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch(&self, staging_dir: &Path) -> AppResult<Vec<PathBuf>> {
        fs::create_dir_all(staging_dir).map_err(|e| {
            AppError::Knowledge(format!(
                "Failed to create data directory {:?}: {}",
                staging_dir, e
            ))
        })?;

        let mut files = Vec::new();
        for entry in fs::read_dir(staging_dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        tracing::debug!("Found {} files in {:?}", files.len(), staging_dir);
        Ok(files)
    }
}
