//! Built-in prompt definitions.

use crate::loader::{parse_prompt, validate_prompt};
use crate::types::PromptDefinition;
use itt_core::AppResult;

/// Classifies a question as answerable or missing information.
pub const TRIAGE_PROMPT_ID: &str = "itt.triage";

/// Answers a question grounded on retrieved bylaw excerpts.
pub const ANSWER_PROMPT_ID: &str = "itt.answer";

const TRIAGE_YAML: &str = include_str!("../prompts/itt.triage.yml");
const ANSWER_YAML: &str = include_str!("../prompts/itt.answer.yml");

/// Built-in definition for `id`, if there is one.
pub fn builtin_prompt(id: &str) -> Option<AppResult<PromptDefinition>> {
    let yaml = match id {
        TRIAGE_PROMPT_ID => TRIAGE_YAML,
        ANSWER_PROMPT_ID => ANSWER_YAML,
        _ => return None,
    };
    Some(parse_prompt(yaml, id).and_then(|def| {
        validate_prompt(&def)?;
        Ok(def)
    }))
}
