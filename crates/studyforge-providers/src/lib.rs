//! studyforge-providers — Completion-service integrations.
//!
//! Implements the `LlmProvider` trait for Ollama and OpenAI-compatible
//! servers, plus a mock backend, and loads the studyforge configuration.

pub mod config;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{create_provider, load_config, load_config_from, ProviderConfig, StudyforgeConfig};
pub use studyforge_core::error::ProviderError;
