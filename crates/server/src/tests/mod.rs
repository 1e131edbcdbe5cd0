//! Handler tests against real state with scripted model replies.

use crate::error::CHAT_FAILURE_MESSAGE;
use crate::handlers::chat::QueryRequest;
use crate::handlers::{health, query, root, sync_knowledge};
use crate::state::{sync_progress, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use itt_agent::{AnswerWorkflow, LlmAnswerGenerator, LlmClassifier};
use itt_core::{AppError, AppResult};
use itt_knowledge::chunk::ChunkConfig;
use itt_knowledge::{
    DocumentSource, EmbeddingConfig, IndexRetriever, Ingestor, KnowledgeRefresher,
    LocalFolderSource, RefreshStatus, RetrievalConfig,
};
use itt_llm::{LlmClient, MockLlmClient};
use itt_prompt::PromptLibrary;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

const AUTO: &str = r#"{"decisao": "AUTO_RESOLVER"}"#;
const ARTICLE: &str = "Art. 5º A Assembleia Geral é o órgão máximo de deliberação do Instituto.";

/// A source whose remote is unreachable.
struct FailingSource;

#[async_trait::async_trait]
impl DocumentSource for FailingSource {
    fn name(&self) -> &str {
        "failing"
    }

    async fn fetch(&self, _staging_dir: &Path) -> AppResult<Vec<PathBuf>> {
        Err(AppError::Drive("503 from www.googleapis.com".to_string()))
    }
}

fn state(dir: &Path, client: Arc<dyn LlmClient>, source: Arc<dyn DocumentSource>) -> AppState {
    let index_path = dir.join("index").join("knowledge.sqlite");
    let data_path = dir.join("data");
    let embedder = itt_knowledge::create_provider(
        &EmbeddingConfig {
            dimensions: 128,
            ..Default::default()
        },
        None,
    )
    .unwrap();
    let prompts = PromptLibrary::builtin().unwrap();

    let workflow = AnswerWorkflow::new(
        Arc::new(LlmClassifier::new(client.clone(), prompts.triage, "m", 0.3)),
        Arc::new(IndexRetriever::new(
            &index_path,
            embedder.clone(),
            RetrievalConfig {
                top_k: 4,
                score_threshold: 0.5,
            },
        )),
        Arc::new(LlmAnswerGenerator::new(client, prompts.answer, "m", 0.3)),
    );
    let ingestor = Ingestor::new(embedder, ChunkConfig::default(), &index_path)
        .unwrap()
        .with_progress(sync_progress());

    AppState {
        workflow,
        refresher: Arc::new(KnowledgeRefresher::new(source, ingestor, &data_path)),
        index_path,
        max_question_chars: 5000,
    }
}

fn request(message: &str) -> Json<QueryRequest> {
    Json(QueryRequest {
        message: message.to_string(),
        user_id: Some("user_123".to_string()),
    })
}

fn seed_documents(dir: &Path) {
    let data = dir.join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("estatuto.txt"), ARTICLE).unwrap();
}

#[tokio::test]
async fn test_sync_then_query_returns_sources() {
    let dir = TempDir::new().unwrap();
    seed_documents(dir.path());
    let client = Arc::new(MockLlmClient::new([
        AUTO,
        "A Assembleia Geral é o órgão máximo do ITT.",
    ]));
    let state = state(dir.path(), client, Arc::new(LocalFolderSource));

    let Json(report) = sync_knowledge(State(state.clone())).await.unwrap();
    assert_eq!(report.status, RefreshStatus::Success);
    assert_eq!(report.message, "Base de conhecimento atualizada com sucesso!");

    let Json(response) = query(State(state.clone()), Ok(request(ARTICLE))).await.unwrap();
    assert_eq!(response.response, "A Assembleia Geral é o órgão máximo do ITT.");
    assert_eq!(response.source_documents, vec![ARTICLE.to_string()]);

    let Json(health) = health(State(state)).await;
    assert!(health.index_ready);
    assert_eq!(health.chunks, 1);
}

#[tokio::test]
async fn test_sync_without_documents_is_skipped() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(MockLlmClient::new(Vec::<String>::new()));
    let state = state(dir.path(), client, Arc::new(LocalFolderSource));

    let Json(report) = sync_knowledge(State(state.clone())).await.unwrap();
    assert_eq!(report.status, RefreshStatus::Skipped);
    assert_eq!(
        report.message,
        "Nenhum documento encontrado. O índice não foi atualizado."
    );

    let Json(health) = health(State(state)).await;
    assert!(!health.index_ready);
    assert_eq!(health.chunks, 0);
}

#[tokio::test]
async fn test_sync_failure_is_categorized() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(MockLlmClient::new(Vec::<String>::new()));
    let state = state(dir.path(), client, Arc::new(FailingSource));

    let err = sync_knowledge(State(state)).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.detail().starts_with("Falha ao atualizar base de conhecimento"));
    assert!(!err.detail().contains("503"));
}

#[tokio::test]
async fn test_blank_message_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(MockLlmClient::new(Vec::<String>::new()));
    let state = state(dir.path(), client.clone(), Arc::new(LocalFolderSource));

    let err = query(State(state), Ok(request("   \n "))).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_oversized_message_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(MockLlmClient::new(Vec::<String>::new()));
    let state = state(dir.path(), client, Arc::new(LocalFolderSource));

    let at_limit = "á".repeat(5000);
    let over_limit = "á".repeat(5001);

    let err = query(State(state.clone()), Ok(request(&over_limit)))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    // At the limit the request passes validation and reaches the (empty) model script
    let err = query(State(state), Ok(request(&at_limit))).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_model_failure_hides_details() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(MockLlmClient::failing("API key not valid"));
    let state = state(dir.path(), client, Arc::new(LocalFolderSource));

    let err = query(State(state), Ok(request("Qual o quórum?")))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.detail(), CHAT_FAILURE_MESSAGE);
}

#[tokio::test]
async fn test_query_before_any_sync_is_server_error() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(MockLlmClient::new([AUTO]));
    let state = state(dir.path(), client, Arc::new(LocalFolderSource));

    let err = query(State(state), Ok(request("Qual o quórum?")))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.code(), "CONFIG_ERROR");
}

#[tokio::test]
async fn test_root_describes_service() {
    let Json(body) = root().await;
    assert_eq!(body["message"], "ITT Chatbot API");
    assert_eq!(body["health"], "/health");
}
