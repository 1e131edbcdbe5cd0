//! Question triage: answer from the bylaws or ask for more details.

use async_trait::async_trait;
use itt_core::{AppError, AppResult};
use itt_llm::{LlmClient, LlmRequest};
use itt_prompt::{build_prompt, PromptDefinition};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// Outcome of classifying a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriageDecision {
    /// Clear enough to look up in the bylaws
    AutoResolvable,
    /// Too vague; the user should supply these details
    NeedsInfo { missing_fields: Vec<String> },
}

#[derive(Debug, Deserialize)]
enum Decisao {
    #[serde(rename = "AUTO_RESOLVER")]
    AutoResolver,
    #[serde(rename = "PEDIR_INFO")]
    PedirInfo,
}

#[derive(Debug, Deserialize)]
struct TriageOutput {
    decisao: Decisao,
    #[serde(default)]
    campos_faltantes: Vec<String>,
}

/// JSON Schema sent with the triage request.
pub fn triage_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "decisao": {
                "type": "string",
                "enum": ["AUTO_RESOLVER", "PEDIR_INFO"]
            },
            "campos_faltantes": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["decisao"]
    })
}

/// Decode the classifier's reply.
///
/// Anything other than the expected JSON object is an error; the only
/// leniency is a single surrounding Markdown code fence.
pub fn parse_triage_output(raw: &str) -> AppResult<TriageDecision> {
    let body = strip_code_fence(raw);
    let output: TriageOutput = serde_json::from_str(body).map_err(|e| {
        AppError::Triage(format!("Unexpected classifier output ({}): {}", e, preview(raw)))
    })?;

    Ok(match output.decisao {
        Decisao::AutoResolver => TriageDecision::AutoResolvable,
        Decisao::PedirInfo => TriageDecision::NeedsInfo {
            missing_fields: output
                .campos_faltantes
                .into_iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect(),
        },
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    match inner.split_once('\n') {
        Some((_lang, body)) => body.trim(),
        None => inner.trim(),
    }
}

fn preview(raw: &str) -> String {
    const MAX: usize = 120;
    let mut out: String = raw.chars().take(MAX).collect();
    if raw.chars().count() > MAX {
        out.push('…');
    }
    out
}

/// Classifies questions.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, question: &str) -> AppResult<TriageDecision>;
}

/// Classifier backed by a completion model with structured output.
pub struct LlmClassifier {
    client: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    temperature: f32,
}

impl LlmClassifier {
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
        }
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    #[instrument(skip(self, question), fields(provider = self.client.provider_name()))]
    async fn classify(&self, question: &str) -> AppResult<TriageDecision> {
        let variables = HashMap::from([("question".to_string(), question.to_string())]);
        let built = build_prompt(&self.prompt, &variables)?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(self.temperature)
            .with_json_schema(triage_schema());
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let response = self.client.complete(&request).await?;
        let decision = parse_triage_output(&response.content)?;
        tracing::debug!("Triage decision: {:?}", decision);
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itt_llm::MockLlmClient;
    use itt_prompt::PromptLibrary;

    #[test]
    fn test_parse_auto_resolver() {
        let decision = parse_triage_output(r#"{"decisao": "AUTO_RESOLVER"}"#).unwrap();
        assert_eq!(decision, TriageDecision::AutoResolvable);
    }

    #[test]
    fn test_parse_pedir_info_with_fields() {
        let decision = parse_triage_output(
            r#"{"decisao": "PEDIR_INFO", "campos_faltantes": ["data", " nome ", ""]}"#,
        )
        .unwrap();
        assert_eq!(
            decision,
            TriageDecision::NeedsInfo {
                missing_fields: vec!["data".to_string(), "nome".to_string()]
            }
        );
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let decision = parse_triage_output(r#"{"decisao": "PEDIR_INFO"}"#).unwrap();
        assert_eq!(
            decision,
            TriageDecision::NeedsInfo {
                missing_fields: vec![]
            }
        );
    }

    #[test]
    fn test_code_fence_tolerated() {
        let raw = "```json\n{\"decisao\": \"AUTO_RESOLVER\", \"campos_faltantes\": []}\n```";
        assert_eq!(
            parse_triage_output(raw).unwrap(),
            TriageDecision::AutoResolvable
        );
    }

    #[test]
    fn test_invalid_outputs_fail_closed() {
        for raw in [
            r#"{"decisao": "auto_resolver"}"#,
            r#"{"decisao": "TALVEZ"}"#,
            r#"{"campos_faltantes": []}"#,
            "AUTO_RESOLVER",
            "",
            "```json\n```json\n{\"decisao\": \"AUTO_RESOLVER\"}\n```\n```",
        ] {
            assert!(
                matches!(parse_triage_output(raw), Err(AppError::Triage(_))),
                "accepted {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_schema_requires_decision() {
        let schema = triage_schema();
        assert_eq!(schema["required"], json!(["decisao"]));
        assert_eq!(
            schema["properties"]["decisao"]["enum"],
            json!(["AUTO_RESOLVER", "PEDIR_INFO"])
        );
    }

    #[tokio::test]
    async fn test_llm_classifier_sends_schema_and_system() {
        let client = Arc::new(MockLlmClient::new([r#"{"decisao": "AUTO_RESOLVER"}"#]));
        let library = PromptLibrary::builtin().unwrap();
        let classifier =
            LlmClassifier::new(client.clone(), library.triage, "gemini-2.5-flash", 0.3);

        let decision = classifier
            .classify("Qual o quórum da Assembleia Geral?")
            .await
            .unwrap();
        assert_eq!(decision, TriageDecision::AutoResolvable);

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "Qual o quórum da Assembleia Geral?");
        assert_eq!(requests[0].model, "gemini-2.5-flash");
        assert!(requests[0].response_schema.is_some());
        assert!(requests[0]
            .system
            .as_deref()
            .unwrap()
            .contains("classificador de perguntas"));
    }

    #[tokio::test]
    async fn test_llm_classifier_propagates_model_failure() {
        let client = Arc::new(MockLlmClient::failing("quota exceeded"));
        let library = PromptLibrary::builtin().unwrap();
        let classifier = LlmClassifier::new(client, library.triage, "m", 0.3);

        assert!(matches!(
            classifier.classify("Oi").await,
            Err(AppError::Llm(_))
        ));
    }
}
