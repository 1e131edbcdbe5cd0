//! Workflow scenarios with scripted model replies and canned retrieval.

use crate::generate::{AnswerGenerator, LlmAnswerGenerator};
use crate::triage::{Classifier, LlmClassifier};
use crate::workflow::{AnswerWorkflow, Route, DONT_KNOW_ANSWER};
use async_trait::async_trait;
use itt_core::{AppError, AppResult};
use itt_knowledge::{KnowledgeChunk, RetrievedChunk, Retriever};
use itt_llm::MockLlmClient;
use itt_prompt::PromptLibrary;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const AUTO: &str = r#"{"decisao": "AUTO_RESOLVER", "campos_faltantes": []}"#;

struct StaticRetriever {
    texts: Vec<&'static str>,
    calls: AtomicUsize,
}

impl StaticRetriever {
    fn new(texts: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            texts,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _query: &str) -> AppResult<Vec<RetrievedChunk>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .texts
            .iter()
            .enumerate()
            .map(|(i, text)| RetrievedChunk {
                chunk: KnowledgeChunk {
                    id: format!("c{}", i),
                    source_id: "estatuto".to_string(),
                    position: i as u32,
                    page: Some(1),
                    text: text.to_string(),
                    embedding: None,
                    metadata: serde_json::Value::Null,
                },
                score: 0.9 - i as f32 * 0.1,
            })
            .collect())
    }
}

struct MissingIndexRetriever;

#[async_trait]
impl Retriever for MissingIndexRetriever {
    async fn retrieve(&self, _query: &str) -> AppResult<Vec<RetrievedChunk>> {
        Err(AppError::Config("Knowledge index not found".to_string()))
    }
}

/// One scripted client serves both triage and generation, in call order.
fn workflow(replies: Vec<&str>, retriever: Arc<dyn Retriever>) -> (AnswerWorkflow, Arc<MockLlmClient>) {
    let client = Arc::new(MockLlmClient::new(replies));
    let library = PromptLibrary::builtin().unwrap();
    let classifier: Arc<dyn Classifier> = Arc::new(LlmClassifier::new(
        client.clone(),
        library.triage,
        "gemini-2.5-flash",
        0.3,
    ));
    let generator: Arc<dyn AnswerGenerator> = Arc::new(LlmAnswerGenerator::new(
        client.clone(),
        library.answer,
        "gemini-2.5-flash",
        0.3,
    ));
    (AnswerWorkflow::new(classifier, retriever, generator), client)
}

#[tokio::test]
async fn test_answer_with_citations() {
    let retriever = StaticRetriever::new(vec![
        "Art. 2º O ITT tem por objetivo promover a pesquisa.",
        "Art. 3º O ITT apoia a formação de pesquisadores.",
    ]);
    let (workflow, client) = workflow(
        vec![AUTO, "O objetivo do instituto é promover a pesquisa."],
        retriever,
    );

    let outcome = workflow.run("Qual o objetivo do instituto?").await.unwrap();

    assert_eq!(outcome.answer, "O objetivo do instituto é promover a pesquisa.");
    assert_eq!(
        outcome.citations,
        vec![
            "Art. 2º O ITT tem por objetivo promover a pesquisa.",
            "Art. 3º O ITT apoia a formação de pesquisadores.",
        ]
    );
    assert!(outcome.success);
    assert_eq!(outcome.route, Route::AutoResolve);
    assert_eq!(client.call_count(), 2);
}

#[tokio::test]
async fn test_empty_retrieval_skips_generation() {
    let (workflow, client) = workflow(vec![AUTO], StaticRetriever::new(vec![]));

    let outcome = workflow.run("Qual a cor da sede?").await.unwrap();

    assert_eq!(outcome.answer, DONT_KNOW_ANSWER);
    assert!(outcome.citations.is_empty());
    assert!(!outcome.success);
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_model_dont_know_drops_citations() {
    let retriever = StaticRetriever::new(vec!["Art. 9º Das eleições."]);
    let (workflow, _client) = workflow(vec![AUTO, "  Não sei!  "], retriever);

    let outcome = workflow.run("Qual o salário do presidente?").await.unwrap();

    assert_eq!(outcome.answer, DONT_KNOW_ANSWER);
    assert!(outcome.citations.is_empty());
    assert!(!outcome.success);
}

#[tokio::test]
async fn test_needs_info_names_missing_fields() {
    let retriever = StaticRetriever::new(vec!["Art. 1º"]);
    let (workflow, client) = workflow(
        vec![r#"{"decisao": "PEDIR_INFO", "campos_faltantes": ["data", "nome"]}"#],
        retriever.clone(),
    );

    let outcome = workflow.run("Quero um certificado").await.unwrap();

    assert_eq!(
        outcome.answer,
        "Para te ajudar melhor, por favor, forneça data, nome."
    );
    assert!(outcome.citations.is_empty());
    assert!(!outcome.success);
    assert_eq!(outcome.route, Route::RequestInfo);
    assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_needs_info_without_fields_uses_fallback() {
    let (workflow, _client) = workflow(
        vec![r#"{"decisao": "PEDIR_INFO"}"#],
        StaticRetriever::new(vec![]),
    );

    let outcome = workflow.run("Oi").await.unwrap();
    assert_eq!(
        outcome.answer,
        "Para te ajudar melhor, por favor, forneça mais detalhes sobre sua dúvida."
    );
}

#[tokio::test]
async fn test_malformed_triage_is_an_error() {
    let retriever = StaticRetriever::new(vec!["Art. 1º"]);
    let (workflow, _client) = workflow(vec!["talvez"], retriever.clone());

    let err = workflow.run("Qual o quórum?").await.unwrap_err();
    assert!(matches!(err, AppError::Triage(_)));
    assert_eq!(retriever.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_index_surfaces_config_error() {
    let (workflow, _client) = workflow(vec![AUTO], Arc::new(MissingIndexRetriever));

    let err = workflow.run("Qual o quórum?").await.unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[tokio::test]
async fn test_same_decision_same_branch() {
    for _ in 0..3 {
        let (workflow, _client) = workflow(
            vec![r#"{"decisao": "PEDIR_INFO", "campos_faltantes": ["data"]}"#],
            StaticRetriever::new(vec!["Art. 1º"]),
        );
        let outcome = workflow.run("Quando?").await.unwrap();
        assert_eq!(outcome.route, Route::RequestInfo);
        assert_eq!(outcome.answer, "Para te ajudar melhor, por favor, forneça data.");
    }
}
