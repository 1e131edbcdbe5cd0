//! Prompt definitions for the ITT chatbot.
//!
//! - YAML prompt definitions with a system instruction and a user template
//! - Built-in Portuguese defaults for triage and answering
//! - Optional per-prompt overrides from a directory
//! - Handlebars rendering

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

pub use builder::build_prompt;
pub use defaults::{builtin_prompt, ANSWER_PROMPT_ID, TRIAGE_PROMPT_ID};
pub use loader::{load_prompt, PromptLibrary};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptOutputSpec};
