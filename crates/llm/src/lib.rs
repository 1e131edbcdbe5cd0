//! Completion model clients for the ITT chatbot.
//!
//! A provider-agnostic `LlmClient` trait with one implementation per
//! backend. Requests can ask for JSON output constrained by a schema, which
//! the triage classifier relies on.
//!
//! # Providers
//! - **Gemini**: Google Generative Language API (default)
//! - **Ollama**: local runtime, handy for offline development
//! - **Mock**: scripted responses for tests
//!
//! # Example
//! ```no_run
//! use itt_llm::{LlmClient, LlmRequest, providers::GeminiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClient::new("api-key")?;
//! let request = LlmRequest::new("Qual o objetivo do instituto?", "gemini-2.5-flash");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GeminiClient, MockLlmClient, OllamaClient};
pub use types::ProviderType;
