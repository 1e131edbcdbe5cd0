//! Error types for the ITT chatbot.
//!
//! One enum covers every failure category of the service: configuration,
//! I/O, model providers, the knowledge index, prompts, the document source,
//! triage and request validation.

use thiserror::Error;

/// Unified error type for the ITT chatbot.
///
/// Library code returns `Result<T, AppError>` and never panics on bad input.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid configuration (credentials, index, API keys)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Completion or embedding provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Index, ingestion and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt loading and rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Remote document source errors (listing, download, auth)
    #[error("Document source error: {0}")]
    Drive(String),

    /// The classifier returned something that is not a valid decision
    #[error("Triage error: {0}")]
    Triage(String),

    /// Rejected user input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Short stable code for the error category, safe to show to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Llm(_) => "LLM_ERROR",
            AppError::Knowledge(_) => "KNOWLEDGE_ERROR",
            AppError::Prompt(_) => "PROMPT_ERROR",
            AppError::Drive(_) => "SOURCE_ERROR",
            AppError::Triage(_) => "TRIAGE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Other(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
