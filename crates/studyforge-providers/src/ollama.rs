//! Ollama (local LLM) provider implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use studyforge_core::error::ProviderError;
use studyforge_core::traits::{
    GenerateRequest, GenerateResponse, LlmProvider, ModelInfo, TokenUsage, DEFAULT_SYSTEM_PROMPT,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama local LLM provider.
pub struct OllamaProvider {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base.trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn unreachable(&self) -> ProviderError {
        ProviderError::NetworkError(format!(
            "Ollama not reachable at {}. Is it running? Start with: ollama serve",
            self.base_url
        ))
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
    num_predict: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelEntry>,
}

#[derive(Deserialize)]
struct OllamaModelEntry {
    name: String,
    #[serde(default)]
    size: Option<u64>,
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let start = Instant::now();

        let system_prompt = request
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let body = OllamaRequest {
            model: request.model.clone(),
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: system_prompt,
                },
                OllamaMessage {
                    role: "user",
                    content: request.prompt.clone(),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                stop: request.stop_sequences.clone(),
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout.as_secs())
                } else if e.is_connect() {
                    self.unreachable()
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(ProviderError::ModelNotFound(format!(
                "Model '{}' not found locally. Pull it with: ollama pull {}",
                request.model, request.model
            ))
            .into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let api_response: OllamaResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let latency_ms = start.elapsed().as_millis() as u64;

        Ok(GenerateResponse {
            content: api_response.message.content,
            model: api_response.model,
            token_usage: TokenUsage::new(
                api_response.prompt_eval_count.unwrap_or(0),
                api_response.eval_count.unwrap_or(0),
            ),
            latency_ms,
        })
    }

    async fn list_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|_| self.unreachable())?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let tags: OllamaTagsResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse tags response: {e}"),
            })?;

        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
                provider: "ollama".into(),
                size_bytes: m.size,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(uri: &str) -> OllamaProvider {
        OllamaProvider::new(uri, Duration::from_secs(10)).unwrap()
    }

    fn request(model: &str) -> GenerateRequest {
        GenerateRequest {
            model: model.into(),
            prompt: "Generate exactly 2 exam practice questions".into(),
            system_prompt: None,
            max_tokens: 1024,
            temperature: 0.7,
            stop_sequences: vec![],
        }
    }

    #[tokio::test]
    async fn successful_generation() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "message": {"role": "assistant", "content": "{\"questions\": []}"},
            "model": "llama3.2",
            "done": true,
            "prompt_eval_count": 30,
            "eval_count": 15
        });

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3.2",
                "stream": false,
                "options": {"num_predict": 1024}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let response = provider(&server.uri()).generate(&request("llama3.2")).await.unwrap();
        assert!(response.content.contains("questions"));
        assert_eq!(response.token_usage.prompt_tokens, 30);
        assert_eq!(response.token_usage.total_tokens, 45);
    }

    #[tokio::test]
    async fn default_system_prompt_is_sent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "messages": [{"role": "system", "content": DEFAULT_SYSTEM_PROMPT}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "ok"},
                "model": "llama3.2"
            })))
            .mount(&server)
            .await;

        let response = provider(&server.uri()).generate(&request("llama3.2")).await.unwrap();
        assert_eq!(response.content, "ok");
        assert_eq!(response.token_usage.total_tokens, 0);
    }

    #[tokio::test]
    async fn model_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .generate(&request("nonexistent"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ollama pull nonexistent"));
        assert!(err
            .downcast_ref::<ProviderError>()
            .is_some_and(ProviderError::is_permanent));
    }

    #[tokio::test]
    async fn server_error_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("out of memory"))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .generate(&request("llama3.2"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
        assert!(err.to_string().contains("out of memory"));
    }

    #[tokio::test]
    async fn unreachable_server() {
        let provider = provider("http://127.0.0.1:1");
        let err = provider.generate(&request("llama3.2")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProviderError>(),
            Some(ProviderError::NetworkError(_))
        ));
    }

    #[tokio::test]
    async fn dynamic_model_listing() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "models": [
                {"name": "llama3.2:latest", "size": 2000000000_u64},
                {"name": "mistral:7b"}
            ]
        });

        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let models = provider(&server.uri()).list_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].id, "llama3.2:latest");
        assert_eq!(models[0].size_bytes, Some(2_000_000_000));
        assert_eq!(models[1].size_bytes, None);
        assert_eq!(models[1].provider, "ollama");
    }

    #[test]
    fn empty_base_url_uses_default() {
        let p = OllamaProvider::new("", Duration::from_secs(1)).unwrap();
        assert_eq!(p.base_url(), DEFAULT_BASE_URL);
        let p = OllamaProvider::new("http://gpu-box:11434/", Duration::from_secs(1)).unwrap();
        assert_eq!(p.base_url(), "http://gpu-box:11434");
    }
}
