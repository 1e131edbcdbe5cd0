//! Embedding providers.
//!
//! The same provider and model must embed both the indexed chunks and the
//! queries; the index records which ones it was built with.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};
