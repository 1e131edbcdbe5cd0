//! Chunking pipeline over parsed documents.

use super::Chunk;
use crate::parser::ParsedDocument;
use itt_core::{AppError, AppResult};
use text_splitter::{ChunkConfig as SplitterConfig, TextSplitter};

/// Configuration for the chunking pipeline.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Splits parsed documents into chunks.
pub struct ChunkPipeline {
    config: ChunkConfig,
}

impl ChunkPipeline {
    /// Create a pipeline; fails if the overlap is not smaller than the size.
    pub fn new(config: ChunkConfig) -> AppResult<Self> {
        splitter_for(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Split every page of `document` into chunks. Positions run across pages.
    pub fn process(
        &self,
        source_id: &str,
        source_name: &str,
        document: &ParsedDocument,
    ) -> AppResult<Vec<Chunk>> {
        let splitter = splitter_for(&self.config)?;
        let mut chunks = Vec::new();

        for page in &document.pages {
            for (offset, text) in splitter.chunk_indices(&page.text) {
                if text.trim().is_empty() {
                    continue;
                }
                chunks.push(Chunk::new(
                    source_id,
                    source_name,
                    chunks.len() as u32,
                    page.number,
                    text,
                    (offset, offset + text.len()),
                ));
            }
        }

        tracing::debug!(
            "Chunked {} ({} pages) into {} chunks",
            source_name,
            document.pages.len(),
            chunks.len()
        );

        Ok(chunks)
    }
}

fn splitter_for(config: &ChunkConfig) -> AppResult<TextSplitter<text_splitter::Characters>> {
    if config.chunk_size == 0 {
        return Err(AppError::Config("Chunk size must be positive".to_string()));
    }
    let splitter_config = SplitterConfig::new(config.chunk_size)
        .with_overlap(config.chunk_overlap)
        .map_err(|e| AppError::Config(format!("Invalid chunk settings: {}", e)))?;
    Ok(TextSplitter::new(splitter_config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ContentType, ParsedPage};

    fn document(pages: &[&str]) -> ParsedDocument {
        ParsedDocument {
            content_type: ContentType::Pdf,
            pages: pages
                .iter()
                .enumerate()
                .map(|(i, text)| ParsedPage {
                    number: i as u32 + 1,
                    text: text.to_string(),
                })
                .collect(),
        }
    }

    fn bylaw_text(articles: usize) -> String {
        (1..=articles)
            .map(|n| {
                format!(
                    "Art. {}º O Instituto Tadao Takahashi observará os princípios da legalidade, \
                     impessoalidade, moralidade, publicidade e eficiência na gestão de seus recursos.",
                    n
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        let config = ChunkConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        };
        assert!(ChunkPipeline::new(config).is_err());
    }

    #[test]
    fn test_chunks_never_exceed_size() {
        let pipeline = ChunkPipeline::new(ChunkConfig {
            chunk_size: 300,
            chunk_overlap: 60,
        })
        .unwrap();
        let text = bylaw_text(40);

        let chunks = pipeline
            .process("src", "estatuto.pdf", &document(&[&text]))
            .unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 300);
            assert_eq!(chunk.metadata.char_count, chunk.text.chars().count());
            assert_eq!(&text[chunk.metadata.byte_range.0..chunk.metadata.byte_range.1], chunk.text);
        }
    }

    #[test]
    fn test_unbroken_text_still_bounded() {
        let pipeline = ChunkPipeline::new(ChunkConfig {
            chunk_size: 50,
            chunk_overlap: 10,
        })
        .unwrap();
        let text = "ç".repeat(400);

        let chunks = pipeline.process("src", "x.txt", &document(&[&text])).unwrap();
        assert!(chunks.len() >= 8);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 50));
    }

    #[test]
    fn test_chunk_count_grows_with_text() {
        let pipeline = ChunkPipeline::new(ChunkConfig::default()).unwrap();

        let mut previous = 0;
        for articles in [1, 5, 20, 60, 120] {
            let text = bylaw_text(articles);
            let count = pipeline
                .process("src", "estatuto.pdf", &document(&[&text]))
                .unwrap()
                .len();
            assert!(count >= previous, "{} articles gave {} < {}", articles, count, previous);
            previous = count;
        }
    }

    #[test]
    fn test_pages_are_chunked_separately() {
        let pipeline = ChunkPipeline::new(ChunkConfig::default()).unwrap();
        let doc = document(&["Capítulo I", "", "Capítulo II"]);

        let chunks = pipeline.process("src", "estatuto.pdf", &doc).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].metadata.page, 1);
        assert_eq!(chunks[1].metadata.page, 3);
        assert_eq!(
            chunks.iter().map(|c| c.position).collect::<Vec<_>>(),
            vec![0, 1]
        );
    }
}
