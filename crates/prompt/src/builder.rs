//! Prompt builder: renders the system and user templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use itt_core::{AppError, AppResult};
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Both the system instruction and the user template are rendered with the
/// same variables. Values are inserted verbatim (no HTML escaping).
///
/// # Example
/// ```no_run
/// use itt_prompt::{build_prompt, PromptLibrary};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let library = PromptLibrary::builtin()?;
/// let vars = HashMap::from([("question".to_string(), "O que é o ITT?".to_string())]);
/// let built = build_prompt(&library.triage, &vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: &HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, variables))
        .transpose()?;
    let user = render_template(&definition.template, variables)?;

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        variables,
    ))
}

fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .render_template(template, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
