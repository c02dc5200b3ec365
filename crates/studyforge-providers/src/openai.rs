//! OpenAI-compatible chat completions provider.
//!
//! Works against api.openai.com as well as local servers that speak the same
//! protocol (llama.cpp server, LM Studio, vLLM), which usually need no key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use studyforge_core::error::ProviderError;
use studyforge_core::traits::{
    GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage, DEFAULT_SYSTEM_PROMPT,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible API provider.
pub struct OpenAiProvider {
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout,
            client,
        })
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("Authorization", format!("Bearer {key}")),
            None => req,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout.as_secs())
        } else if e.is_connect() {
            ProviderError::NetworkError(format!("{} not reachable: {e}", self.base_url))
        } else {
            ProviderError::NetworkError(e.to_string())
        }
    }
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiModelList {
    #[serde(default)]
    data: Vec<OpenAiModelEntry>,
}

#[derive(Deserialize)]
struct OpenAiModelEntry {
    id: String,
}

/// Map an HTTP error status to a provider error.
async fn status_error(response: reqwest::Response, model: &str) -> ProviderError {
    let status = response.status().as_u16();
    match status {
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            ProviderError::RateLimited {
                retry_after_ms: retry_after,
            }
        }
        401 | 403 => {
            ProviderError::AuthenticationFailed(response.text().await.unwrap_or_default())
        }
        404 => ProviderError::ModelNotFound(model.to_string()),
        _ => ProviderError::ApiError {
            status,
            message: response.text().await.unwrap_or_default(),
        },
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let system_prompt = request
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let body = OpenAiRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: system_prompt,
                },
                OpenAiMessage {
                    role: "user",
                    content: request.prompt.clone(),
                },
            ],
            stop: request.stop_sequences.clone(),
        };

        let response = self
            .authorized(
                self.client
                    .post(format!("{}/v1/chat/completions", self.base_url)),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(status_error(response, &request.model).await.into());
        }

        let api_response: OpenAiResponse = response.json().await.map_err(|e| {
            ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            }
        })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(GenerateResponse {
            content,
            model: api_response.model.unwrap_or_else(|| request.model.clone()),
            token_usage: TokenUsage::new(
                api_response.usage.prompt_tokens,
                api_response.usage.completion_tokens,
            ),
            latency_ms,
        })
    }

    async fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
        let response = self
            .authorized(self.client.get(format!("{}/v1/models", self.base_url)))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(status_error(response, "").await.into());
        }

        let list: OpenAiModelList = response.json().await.map_err(|e| ProviderError::ApiError {
            status: 0,
            message: format!("failed to parse model list: {e}"),
        })?;

        Ok(list
            .data
            .into_iter()
            .map(|m| ModelInfo {
                name: m.id.clone(),
                id: m.id,
                provider: "openai".into(),
                size_bytes: None,
            })
            .collect())
    }
}
