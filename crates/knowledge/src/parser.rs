//! Source document parsing and text extraction.
//!
//! PDFs are extracted page by page so chunks never straddle a page break.
//! Plain text and Markdown are supported for local development folders.

use itt_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Markdown,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => Self::Pdf,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Markdown => "markdown",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// One page of extracted text.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// 1-based page number; plain text files are a single page
    pub number: u32,
    pub text: String,
}

/// Extracted text of a document.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub content_type: ContentType,
    pub pages: Vec<ParsedPage>,
}

impl ParsedDocument {
    /// Total extracted text size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.pages.iter().map(|p| p.text.len() as u64).sum()
    }

    /// True when no page has any text.
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }
}

/// Extracts text from one kind of document.
pub trait DocumentParser: Send + Sync {
    fn can_parse(&self, path: &Path) -> bool;

    fn parse(&self, path: &Path) -> AppResult<ParsedDocument>;
}

/// Parser for PDF files.
#[derive(Debug, Default)]
pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn can_parse(&self, path: &Path) -> bool {
        ContentType::from_path(path) == ContentType::Pdf
    }

    fn parse(&self, path: &Path) -> AppResult<ParsedDocument> {
        tracing::debug!("Parsing PDF: {:?}", path);

        // pdf-extract panics on some malformed files
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            pdf_extract::extract_text_by_pages(path)
        }));

        let raw_pages = match result {
            Ok(Ok(pages)) => pages,
            Ok(Err(e)) => {
                return Err(AppError::Knowledge(format!(
                    "Failed to extract text from {:?}: {}",
                    path, e
                )))
            }
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                return Err(AppError::Knowledge(format!(
                    "PDF extractor crashed on {:?}: {}",
                    path, message
                )));
            }
        };

        let pages = raw_pages
            .iter()
            .enumerate()
            .map(|(i, text)| ParsedPage {
                number: i as u32 + 1,
                text: clean_extracted_text(text),
            })
            .collect();

        Ok(ParsedDocument {
            content_type: ContentType::Pdf,
            pages,
        })
    }
}

/// Parser for `.txt` and `.md` files.
#[derive(Debug, Default)]
pub struct TextParser;

impl DocumentParser for TextParser {
    fn can_parse(&self, path: &Path) -> bool {
        matches!(
            ContentType::from_path(path),
            ContentType::PlainText | ContentType::Markdown
        )
    }

    fn parse(&self, path: &Path) -> AppResult<ParsedDocument> {
        let raw = fs::read_to_string(path)
            .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

        Ok(ParsedDocument {
            content_type: ContentType::from_path(path),
            pages: vec![ParsedPage {
                number: 1,
                text: clean_extracted_text(&raw),
            }],
        })
    }
}

/// The set of parsers used during ingestion.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn DocumentParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self {
            parsers: vec![Box::new(PdfParser), Box::new(TextParser)],
        }
    }
}

impl ParserRegistry {
    pub fn supports(&self, path: &Path) -> bool {
        self.parsers.iter().any(|p| p.can_parse(path))
    }

    pub fn parse(&self, path: &Path) -> AppResult<ParsedDocument> {
        let parser = self
            .parsers
            .iter()
            .find(|p| p.can_parse(path))
            .ok_or_else(|| {
                AppError::Knowledge(format!("No parser for {:?}", path.file_name()))
            })?;
        parser.parse(path)
    }
}

/// Normalize extracted text: trim lines, drop form feeds, collapse runs of
/// blank lines into one paragraph break.
pub fn clean_extracted_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut blank_run = 0;

    for line in text.lines() {
        let trimmed = line.trim_matches(|c: char| c.is_whitespace() || c == '\x0C');
        if trimmed.is_empty() {
            blank_run += 1;
            continue;
        }
        if !result.is_empty() {
            result.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        result.push_str(trimmed);
        blank_run = 0;
    }

    result
}
