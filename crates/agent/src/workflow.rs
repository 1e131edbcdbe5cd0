//! The answer workflow: triage, then either answer or ask for details.
//!
//! ```text
//! START ─► Triage ─┬─► AutoResolve ─┬─► END
//!                  └─► RequestInfo ─┘
//! ```

use crate::generate::AnswerGenerator;
use crate::triage::{Classifier, TriageDecision};
use itt_core::AppResult;
use itt_knowledge::Retriever;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Answer given when the bylaws do not cover the question.
pub const DONT_KNOW_ANSWER: &str = "Não sei.";

/// The model's "don't know" reply once trailing punctuation is removed.
const DONT_KNOW_PHRASE: &str = "Não sei";

/// Used when triage asks for details without naming any.
pub const REQUEST_INFO_FALLBACK: &str = "mais detalhes sobre sua dúvida";

/// Branch taken after triage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    AutoResolve,
    RequestInfo,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::AutoResolve => "auto_resolve",
            Route::RequestInfo => "request_info",
        }
    }
}

/// Final result of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowOutcome {
    pub answer: String,

    /// Verbatim text of the excerpts the answer was grounded on
    pub citations: Vec<String>,

    /// True only when the answer came from the bylaws
    pub success: bool,

    pub route: Route,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Triage,
    AutoResolve,
    RequestInfo,
    End,
}

/// Accumulated state as the run moves through the nodes.
#[derive(Debug)]
struct WorkflowState {
    question: String,
    decision: Option<TriageDecision>,
    answer: String,
    citations: Vec<String>,
    success: bool,
    route: Route,
}

impl WorkflowState {
    fn new(question: &str) -> Self {
        Self {
            question: question.to_string(),
            decision: None,
            answer: String::new(),
            citations: Vec::new(),
            success: false,
            route: Route::RequestInfo,
        }
    }

    fn dont_know(&mut self) {
        self.answer = DONT_KNOW_ANSWER.to_string();
        self.citations.clear();
        self.success = false;
    }

    fn into_outcome(self) -> WorkflowOutcome {
        WorkflowOutcome {
            answer: self.answer,
            citations: self.citations,
            success: self.success,
            route: self.route,
        }
    }
}

/// Runs questions through triage and answering.
///
/// Collaborators are shared trait objects so one workflow serves every
/// request.
#[derive(Clone)]
pub struct AnswerWorkflow {
    classifier: Arc<dyn Classifier>,
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn AnswerGenerator>,
}

impl AnswerWorkflow {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            classifier,
            retriever,
            generator,
        }
    }

    /// Answer `question`. Errors from any collaborator end the run.
    #[instrument(skip_all)]
    pub async fn run(&self, question: &str) -> AppResult<WorkflowOutcome> {
        let mut state = WorkflowState::new(question);
        let mut node = Node::Triage;

        loop {
            node = match node {
                Node::Triage => self.triage(&mut state).await?,
                Node::AutoResolve => self.auto_resolve(&mut state).await?,
                Node::RequestInfo => request_info(&mut state),
                Node::End => break,
            };
        }

        tracing::info!(
            route = state.route.as_str(),
            success = state.success,
            citations = state.citations.len(),
            "Workflow finished"
        );
        Ok(state.into_outcome())
    }

    async fn triage(&self, state: &mut WorkflowState) -> AppResult<Node> {
        let decision = self.classifier.classify(&state.question).await?;
        let next = match decision {
            TriageDecision::AutoResolvable => Node::AutoResolve,
            TriageDecision::NeedsInfo { .. } => Node::RequestInfo,
        };
        state.decision = Some(decision);
        Ok(next)
    }

    async fn auto_resolve(&self, state: &mut WorkflowState) -> AppResult<Node> {
        state.route = Route::AutoResolve;

        let related = self.retriever.retrieve(&state.question).await?;
        if related.is_empty() {
            tracing::info!("No relevant excerpts; answering with the fallback");
            state.dont_know();
            return Ok(Node::End);
        }

        let generated = self.generator.generate(&state.question, &related).await?;
        let text = generated.trim();

        if is_dont_know(text) {
            state.dont_know();
            return Ok(Node::End);
        }

        state.answer = text.to_string();
        state.citations = related.into_iter().map(|r| r.chunk.text).collect();
        state.success = true;
        Ok(Node::End)
    }
}

fn request_info(state: &mut WorkflowState) -> Node {
    state.route = Route::RequestInfo;

    let fields = match &state.decision {
        Some(TriageDecision::NeedsInfo { missing_fields }) if !missing_fields.is_empty() => {
            missing_fields.join(", ")
        }
        _ => REQUEST_INFO_FALLBACK.to_string(),
    };

    state.answer = format!("Para te ajudar melhor, por favor, forneça {}.", fields);
    state.citations.clear();
    state.success = false;
    Node::End
}

/// True when the model answered with the "don't know" sentence.
fn is_dont_know(text: &str) -> bool {
    text.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?'))
        == DONT_KNOW_PHRASE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_dont_know() {
        assert!(is_dont_know("Não sei."));
        assert!(is_dont_know("  Não sei  "));
        assert!(is_dont_know("Não sei!?"));
        assert!(!is_dont_know("não sei."));
        assert!(!is_dont_know("Não sei ao certo, mas o artigo 5º diz..."));
    }

    #[test]
    fn test_request_info_joins_fields() {
        let mut state = WorkflowState::new("Quero um certificado");
        state.decision = Some(TriageDecision::NeedsInfo {
            missing_fields: vec!["data".to_string(), "nome".to_string()],
        });

        assert_eq!(request_info(&mut state), Node::End);
        assert_eq!(
            state.answer,
            "Para te ajudar melhor, por favor, forneça data, nome."
        );
        assert!(!state.success);
        assert_eq!(state.route, Route::RequestInfo);
    }

    #[test]
    fn test_request_info_fallback() {
        let mut state = WorkflowState::new("Oi");
        state.decision = Some(TriageDecision::NeedsInfo {
            missing_fields: vec![],
        });

        request_info(&mut state);
        assert_eq!(
            state.answer,
            "Para te ajudar melhor, por favor, forneça mais detalhes sobre sua dúvida."
        );
    }
}
