//! Answer generation grounded on retrieved bylaw excerpts.

use async_trait::async_trait;
use itt_core::AppResult;
use itt_knowledge::RetrievedChunk;
use itt_llm::{LlmClient, LlmRequest};
use itt_prompt::{build_prompt, PromptDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// Produces an answer from a question and its supporting excerpts.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, question: &str, context: &[RetrievedChunk]) -> AppResult<String>;
}

/// Join excerpt texts in retrieval order, separated by blank lines.
pub fn build_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct LlmAnswerGenerator {
    client: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    temperature: f32,
    max_output_tokens: Option<u32>,
}

impl LlmAnswerGenerator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        model: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            prompt,
            model: model.into(),
            temperature,
            max_output_tokens: None,
        }
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: Option<u32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    #[instrument(skip_all, fields(chunks = context.len(), provider = self.client.provider_name()))]
    async fn generate(&self, question: &str, context: &[RetrievedChunk]) -> AppResult<String> {
        let variables = HashMap::from([
            ("question".to_string(), question.to_string()),
            ("context".to_string(), build_context(context)),
        ]);
        let built = build_prompt(&self.prompt, &variables)?;

        let mut request =
            LlmRequest::new(built.user, &self.model).with_temperature(self.temperature);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = self.max_output_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self.client.complete(&request).await?;
        tracing::debug!(
            "Generated answer ({} tokens, finish reason {:?})",
            response.usage.completion_tokens,
            response.finish_reason
        );
        Ok(response.content)
    }
}
