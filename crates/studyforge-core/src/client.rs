//! Generation client: the single seam between the pipeline and a model backend.
//!
//! The client neither retries nor imposes a deadline. Callers wrap calls in
//! [`with_timeout`] and decide on retries from the returned [`StudyError`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::StudyError;
use crate::traits::{GenerateRequest, LlmProvider, TokenUsage};

/// Model settings applied to every request a client sends.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Model identifier (e.g. "llama3.2").
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Max tokens per completion.
    pub max_tokens: u32,
    /// Optional system prompt override.
    pub system_prompt: Option<String>,
}

impl ClientSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            system_prompt: None,
        }
    }
}

/// Raw text returned by the model, with accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub token_usage: TokenUsage,
    pub latency_ms: u64,
}

/// Sends prompts to a completion backend.
#[derive(Clone)]
pub struct GenerationClient {
    provider: Arc<dyn LlmProvider>,
    settings: ClientSettings,
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn LlmProvider>, settings: ClientSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Send one prompt and return the raw completion text.
    ///
    /// Any backend failure surfaces as [`StudyError::ServiceUnavailable`].
    pub async fn complete(&self, prompt: &str) -> Result<Completion, StudyError> {
        let request = GenerateRequest {
            model: self.settings.model.clone(),
            prompt: prompt.to_string(),
            system_prompt: self.settings.system_prompt.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            stop_sequences: vec![],
        };

        debug!(
            provider = self.provider.name(),
            model = %self.settings.model,
            prompt_chars = prompt.len(),
            "sending prompt"
        );

        let response = self
            .provider
            .generate(&request)
            .await
            .map_err(StudyError::unavailable)?;

        debug!(
            latency_ms = response.latency_ms,
            completion_tokens = response.token_usage.completion_tokens,
            "received completion"
        );

        Ok(Completion {
            text: response.content,
            model: response.model,
            token_usage: response.token_usage,
            latency_ms: response.latency_ms,
        })
    }
}

/// Run a model call under a caller-imposed deadline.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, StudyError>
where
    F: Future<Output = Result<T, StudyError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StudyError::deadline_exceeded(limit.as_secs())),
    }
}
