//! Mock provider for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use studyforge_core::error::ProviderError;
use studyforge_core::traits::{
    GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage,
};

/// A mock completion service for exercising the pipeline without a model.
///
/// Replies are chosen by the first rule whose key occurs in the prompt.
pub struct MockProvider {
    /// Prompt substring → reply, checked in order.
    responses: Vec<(String, String)>,
    /// Reply when no rule matches.
    default_response: String,
    /// Fail every call with this error instead of replying.
    failure: Option<fn() -> ProviderError>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockProvider {
    /// Create a mock with prompt-substring → reply rules.
    pub fn new<I, K, V>(responses: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            responses: responses
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            default_response: "{\"questions\": []}".to_string(),
            failure: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn with_fixed_response(response: &str) -> Self {
        Self::new(Vec::<(String, String)>::new()).with_default(response)
    }

    /// Create a mock whose every call fails.
    pub fn failing(failure: fn() -> ProviderError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(Vec::<(String, String)>::new())
        }
    }

    pub fn with_default(mut self, response: &str) -> Self {
        self.default_response = response.to_string();
        self
    }

    /// Get the number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this provider.
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(request.clone());

        if let Some(failure) = self.failure {
            return Err(failure().into());
        }

        let content = self
            .responses
            .iter()
            .find(|(key, _)| request.prompt.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_response.clone());

        // Rough estimate: four characters per token.
        let token_usage = TokenUsage::new(
            (request.prompt.len() / 4) as u32,
            (content.len() / 4) as u32,
        );

        Ok(GenerateResponse {
            content,
            model: request.model.clone(),
            token_usage,
            latency_ms: 1,
        })
    }

    async fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            size_bytes: None,
        }])
    }
}
