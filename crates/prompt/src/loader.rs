//! Prompt loading: YAML files with built-in fallbacks.

use crate::defaults::{builtin_prompt, ANSWER_PROMPT_ID, TRIAGE_PROMPT_ID};
use crate::types::PromptDefinition;
use itt_core::{AppError, AppResult};
use std::path::Path;

/// Load a prompt definition by ID from `prompts_dir`.
///
/// Looks for `<id>.yml` in the directory.
///
/// # Example
/// ```no_run
/// use itt_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("prompts"), "itt.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(prompts_dir: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir.join(format!("{}.yml", prompt_id));

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    if !prompt_file.exists() {
        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition = parse_prompt(&contents, &prompt_file.display().to_string())?;
    validate_prompt(&definition)?;

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file {:?} declares id '{}', expected '{}'",
            prompt_file, definition.id, prompt_id
        )));
    }

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

pub(crate) fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    serde_yaml::from_str(contents)
        .map_err(|e| AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e)))
}

pub(crate) fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

/// The prompts the service needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    pub triage: PromptDefinition,
    pub answer: PromptDefinition,
}

impl PromptLibrary {
    /// Built-in prompts only.
    pub fn builtin() -> AppResult<Self> {
        Self::load(None)
    }

    /// Built-in prompts, each replaced by `<id>.yml` from `overrides` when
    /// that file exists.
    pub fn load(overrides: Option<&Path>) -> AppResult<Self> {
        Ok(Self {
            triage: resolve(overrides, TRIAGE_PROMPT_ID)?,
            answer: resolve(overrides, ANSWER_PROMPT_ID)?,
        })
    }
}

fn resolve(overrides: Option<&Path>, id: &str) -> AppResult<PromptDefinition> {
    if let Some(dir) = overrides {
        if dir.join(format!("{}.yml", id)).exists() {
            return load_prompt(dir, id);
        }
    }
    builtin_prompt(id)
        .unwrap_or_else(|| Err(AppError::Prompt(format!("No built-in prompt '{}'", id))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_prompt(dir: &Path, id: &str, valid: bool) -> PathBuf {
        let content = if valid {
            format!(
                r#"
id: {}
title: "Test Prompt"
apiVersion: "1.0"
system: "Responda em uma frase."
template: "Pergunta: {{{{question}}}}"
output:
  format: text
"#,
                id
            )
        } else {
            "invalid: yaml: content:".to_string()
        };

        let file_path = dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    #[test]
    fn test_load_valid_prompt() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "test.prompt", true);

        let prompt = load_prompt(temp_dir.path(), "test.prompt").unwrap();
        assert_eq!(prompt.id, "test.prompt");
        assert_eq!(prompt.template, "Pergunta: {{question}}");
    }

    #[test]
    fn test_load_nonexistent_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), "invalid", false);
        assert!(load_prompt(temp_dir.path(), "invalid").is_err());
    }

    #[test]
    fn test_id_must_match_file_name() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_test_prompt(temp_dir.path(), "itt.other", true);
        fs::rename(&path, temp_dir.path().join("itt.answer.yml")).unwrap();
        assert!(load_prompt(temp_dir.path(), "itt.answer").is_err());
    }

    #[test]
    fn test_library_override() {
        let temp_dir = TempDir::new().unwrap();
        create_test_prompt(temp_dir.path(), ANSWER_PROMPT_ID, true);

        let library = PromptLibrary::load(Some(temp_dir.path())).unwrap();
        assert_eq!(library.answer.title, "Test Prompt");
        // No override file, so the built-in triage prompt is kept
        assert_eq!(library.triage.id, TRIAGE_PROMPT_ID);
        assert!(library.triage.output.is_json());
    }
}
