//! Minimal Drive v3 client: list a folder's PDFs and download them.

use crate::auth::TokenSource;
use itt_core::{AppError, AppResult};
use serde::Deserialize;
use std::path::Path;
use tracing::instrument;

const DEFAULT_DRIVE_URL: &str = "https://www.googleapis.com/drive/v3";
const PAGE_SIZE: &str = "100";
const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

pub struct DriveClient {
    base_url: String,
    tokens: TokenSource,
    http: reqwest::Client,
}

impl DriveClient {
    pub fn new(tokens: TokenSource, http: reqwest::Client) -> Self {
        Self::with_base_url(DEFAULT_DRIVE_URL, tokens, http)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        tokens: TokenSource,
        http: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            http,
        }
    }

    /// Every non-trashed PDF directly inside `folder_id`, across all pages.
    #[instrument(skip(self))]
    pub async fn list_pdfs(&self, folder_id: &str) -> AppResult<Vec<DriveFile>> {
        let query = list_query(folder_id);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.tokens.access_token().await?;
            let mut params = vec![
                ("q", query.as_str()),
                ("pageSize", PAGE_SIZE),
                ("fields", "nextPageToken, files(id, name)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];
            if let Some(page) = page_token.as_deref() {
                params.push(("pageToken", page));
            }

            let response = self
                .http
                .get(format!("{}/files", self.base_url))
                .bearer_auth(&token)
                .query(&params)
                .send()
                .await
                .map_err(|e| AppError::Drive(format!("Failed to list folder: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::Drive(format!(
                    "Drive list returned {}: {}",
                    status, body
                )));
            }

            let page: FileList = response
                .json()
                .await
                .map_err(|e| AppError::Drive(format!("Invalid Drive list response: {}", e)))?;

            files.extend(page.files);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        tracing::info!("Found {} PDFs in Drive folder", files.len());
        Ok(files)
    }

    /// Download the content of `file` to `dest`.
    #[instrument(skip(self, dest), fields(file = %file.name))]
    pub async fn download(&self, file: &DriveFile, dest: &Path) -> AppResult<u64> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .get(format!("{}/files/{}", self.base_url, file.id))
            .bearer_auth(&token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| AppError::Drive(format!("Failed to download {}: {}", file.name, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Drive(format!(
                "Drive download of {} returned {}",
                file.name, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Drive(format!("Failed to read {}: {}", file.name, e)))?;

        tokio::fs::write(dest, &bytes).await?;
        tracing::debug!("Downloaded {} ({} bytes)", file.name, bytes.len());
        Ok(bytes.len() as u64)
    }
}

/// Drive search expression for the PDFs in a folder.
pub fn list_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "'{}' in parents and mimeType='{}' and trashed=false",
        escaped, PDF_MIME
    )
}

/// A local file name for a remote one that cannot leave the staging
/// directory: path separators and control characters are replaced.
///
/// Listed files are PDFs by MIME type, so the name always ends in `.pdf`
/// for the ingestor to pick it up.
pub fn sanitize_file_name(name: &str, fallback_id: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.');

    if cleaned.is_empty() {
        format!("{}.pdf", fallback_id)
    } else if cleaned.to_lowercase().ends_with(".pdf") {
        cleaned.to_string()
    } else {
        format!("{}.pdf", cleaned)
    }
}
