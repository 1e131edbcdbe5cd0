//! Drive folder as a knowledge document source.

use crate::auth::TokenSource;
use crate::client::{sanitize_file_name, DriveClient};
use crate::credentials::ServiceAccountKey;
use async_trait::async_trait;
use itt_core::config::DriveSettings;
use itt_core::{AppError, AppResult};
use itt_knowledge::DocumentSource;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const HTTP_TIMEOUT_SECS: u64 = 120;

/// Replaces the staging directory's contents with the PDFs of a Drive folder.
pub struct DriveSource {
    client: DriveClient,
    folder_id: String,
}

impl DriveSource {
    pub fn new(client: DriveClient, folder_id: impl Into<String>) -> Self {
        Self {
            client,
            folder_id: folder_id.into(),
        }
    }

    /// Build a source from settings; `None` when no folder is configured.
    pub fn from_settings(settings: &DriveSettings) -> AppResult<Option<Self>> {
        let Some(folder_id) = settings.folder_id.as_deref().filter(|id| !id.trim().is_empty())
        else {
            return Ok(None);
        };

        let key = ServiceAccountKey::resolve(
            &settings.credentials_path,
            settings.credentials_json.as_deref(),
        )?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;
        let tokens = TokenSource::new(key, http.clone())?;

        Ok(Some(Self::new(DriveClient::new(tokens, http), folder_id.trim())))
    }
}

#[async_trait]
impl DocumentSource for DriveSource {
    fn name(&self) -> &str {
        "google-drive"
    }

    async fn fetch(&self, staging_dir: &Path) -> AppResult<Vec<PathBuf>> {
        // List before clearing so a Drive outage leaves the staged files alone
        let files = self.client.list_pdfs(&self.folder_id).await?;

        clear_staging(staging_dir)?;

        let mut taken = HashSet::new();
        let mut downloaded = Vec::with_capacity(files.len());
        for file in &files {
            let mut local_name = sanitize_file_name(&file.name, &file.id);
            if !taken.insert(local_name.clone()) {
                local_name = format!("{}-{}", file.id, local_name);
                taken.insert(local_name.clone());
            }

            let dest = staging_dir.join(&local_name);
            self.client.download(file, &dest).await?;
            downloaded.push(dest);
        }

        tracing::info!(
            "Downloaded {} files from Drive into {:?}",
            downloaded.len(),
            staging_dir
        );
        Ok(downloaded)
    }
}

/// Empty `dir` entirely, creating it if needed.
fn clear_staging(dir: &Path) -> AppResult<()> {
    fs::create_dir_all(dir).map_err(|e| {
        AppError::Drive(format!("Failed to create staging directory {:?}: {}", dir, e))
    })?;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_folder_means_no_source() {
        let settings = DriveSettings {
            folder_id: None,
            ..Default::default()
        };
        assert!(DriveSource::from_settings(&settings).unwrap().is_none());

        let blank = DriveSettings {
            folder_id: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(DriveSource::from_settings(&blank).unwrap().is_none());
    }

    #[test]
    fn test_folder_without_credentials_is_config_error() {
        let dir = TempDir::new().unwrap();
        let settings = DriveSettings {
            folder_id: Some("folder".to_string()),
            credentials_path: dir.path().join("missing.json"),
            credentials_json: None,
        };
        assert!(matches!(
            DriveSource::from_settings(&settings),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_clear_staging_removes_everything() {
        let dir = TempDir::new().unwrap();
        let staging = dir.path().join("data");
        fs::create_dir_all(staging.join("old").join("deeper")).unwrap();
        fs::write(staging.join("old.pdf"), b"x").unwrap();
        fs::write(staging.join("old").join("revogado.txt"), b"y").unwrap();

        clear_staging(&staging).unwrap();

        assert!(staging.is_dir());
        assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);
    }

    #[test]
    fn test_clear_staging_creates_missing_dir() {
        let dir = TempDir::new().unwrap();
        let staging = dir.path().join("data");

        clear_staging(&staging).unwrap();
        assert!(staging.is_dir());
    }
}
