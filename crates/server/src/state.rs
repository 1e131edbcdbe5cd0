//! Shared application state, built once at startup.

use itt_agent::{AnswerWorkflow, LlmAnswerGenerator, LlmClassifier};
use itt_core::{AppConfig, AppResult};
use itt_drive::DriveSource;
use itt_knowledge::progress::{ProgressEvent, ProgressReporter};
use itt_knowledge::{
    create_provider, DocumentSource, EmbeddingConfig, IndexRetriever, Ingestor,
    KnowledgeBaseConfig, KnowledgeRefresher, LocalFolderSource,
};
use itt_llm::create_client;
use itt_prompt::PromptLibrary;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub workflow: AnswerWorkflow,
    pub refresher: Arc<KnowledgeRefresher>,
    pub index_path: PathBuf,
    pub max_question_chars: usize,
}

impl AppState {
    /// Construct every client and collaborator from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let prompts = PromptLibrary::load(config.prompts_dir.as_deref())?;
        let api_key = config.llm.api_key.as_deref();

        let llm = create_client(
            &config.llm.provider,
            config.llm.endpoint.as_deref(),
            api_key,
            Duration::from_secs(config.llm.timeout_secs),
        )?;
        let embedder = create_provider(&EmbeddingConfig::from(&config.embedding), api_key)?;
        let knowledge = KnowledgeBaseConfig::from(&config.knowledge);

        let classifier = Arc::new(LlmClassifier::new(
            llm.clone(),
            prompts.triage,
            &config.llm.model,
            config.llm.temperature,
        ));
        let generator = Arc::new(
            LlmAnswerGenerator::new(
                llm,
                prompts.answer,
                &config.llm.model,
                config.llm.temperature,
            )
            .with_max_output_tokens(config.llm.max_output_tokens),
        );
        let retriever = Arc::new(IndexRetriever::new(
            &knowledge.index_path,
            embedder.clone(),
            knowledge.retrieval.clone(),
        ));

        let source: Arc<dyn DocumentSource> = match DriveSource::from_settings(&config.drive)? {
            Some(drive) => {
                tracing::info!("Documents will be synced from Google Drive");
                Arc::new(drive)
            }
            None => {
                tracing::info!(
                    "No Drive folder configured; indexing local files in {:?}",
                    knowledge.data_path
                );
                Arc::new(LocalFolderSource)
            }
        };
        let ingestor = Ingestor::new(embedder, knowledge.chunk.clone(), &knowledge.index_path)?
            .with_progress(sync_progress());
        let refresher = Arc::new(KnowledgeRefresher::new(
            source,
            ingestor,
            &knowledge.data_path,
        ));

        tracing::info!(
            llm = %config.llm.provider,
            model = %config.llm.model,
            embedding = %config.embedding.model,
            index = ?knowledge.index_path,
            "Services initialized"
        );

        Ok(Self {
            workflow: AnswerWorkflow::new(classifier, retriever, generator),
            refresher,
            index_path: knowledge.index_path,
            max_question_chars: config.server.max_question_chars,
        })
    }
}

/// Reports each ingestion step of a knowledge sync in the service log.
pub(crate) fn sync_progress() -> ProgressReporter {
    ProgressReporter::new(Arc::new(|event: ProgressEvent| {
        tracing::info!(target: "itt_server::sync", "{}", event.format_simple());
    }))
}
