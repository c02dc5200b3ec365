//! Core trait definitions for completion-service backends.
//!
//! The async trait is implemented by the `studyforge-providers` crate, one
//! adapter per backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LLM Provider trait
// ---------------------------------------------------------------------------

/// Trait for backends that turn a prompt into generated text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "ollama").
    fn name(&self) -> &str;

    /// Produce a completion for a prompt.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;

    /// List the models the backend can serve.
    async fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>>;
}

/// Request for a single completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "llama3.2").
    pub model: String,
    /// The main prompt.
    pub prompt: String,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Stop sequences.
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

/// Response from a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw response content.
    pub content: String,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
        self.total_tokens += rhs.total_tokens;
    }
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Provider name.
    pub provider: String,
    /// On-disk size in bytes, when the backend reports it.
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

// ---------------------------------------------------------------------------
// Default system prompt
// ---------------------------------------------------------------------------

/// Default system prompt for question generation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an experienced educator who writes exam questions. Base every question strictly on the course material you are given. Respond ONLY with valid JSON in the exact shape requested, without commentary.";
