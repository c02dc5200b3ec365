//! Configuration loading and provider factory.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use studyforge_core::assembler::AssemblerConfig;
use studyforge_core::client::ClientSettings;
use studyforge_core::traits::LlmProvider;

use crate::mock::MockProvider;
use crate::ollama::{OllamaProvider, DEFAULT_BASE_URL as DEFAULT_OLLAMA_URL};
use crate::openai::OpenAiProvider;

/// Configuration for a single completion service.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
    OpenAI {
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
    },
    /// Canned replies, for dry runs and tests.
    Mock {
        /// Prompt substring → reply.
        #[serde(default)]
        responses: BTreeMap<String, String>,
        #[serde(default)]
        default_response: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::OpenAI { api_key, base_url } => f
                .debug_struct("OpenAI")
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Mock { responses, .. } => f
                .debug_struct("Mock")
                .field("rules", &responses.len())
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

/// Top-level studyforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyforgeConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Default provider to use.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Default model to use.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Sampling temperature for generation.
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    /// Max tokens per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Max retries on transient provider errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Max levels generated concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Deadline for a single model call.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Model calls per level before a shortfall is reported.
    #[serde(default = "default_max_attempts")]
    pub max_attempts_per_level: u32,
    /// Upper bound on characters per content chunk.
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    /// Output directory for exported exams.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_model() -> String {
    "llama3.2".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_parallelism() -> usize {
    4
}
fn default_request_timeout() -> u64 {
    300
}
fn default_max_attempts() -> u32 {
    3
}
fn default_max_chunk_chars() -> usize {
    6000
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./studyforge-output")
}

impl Default for StudyforgeConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            parallelism: default_parallelism(),
            request_timeout_secs: default_request_timeout(),
            max_attempts_per_level: default_max_attempts(),
            max_chunk_chars: default_max_chunk_chars(),
            output_dir: default_output_dir(),
        }
    }
}

impl StudyforgeConfig {
    /// Look up a provider by name.
    pub fn provider(&self, name: &str) -> Result<&ProviderConfig> {
        self.providers.get(name).ok_or_else(|| {
            let mut known: Vec<&str> = self.providers.keys().map(String::as_str).collect();
            known.sort_unstable();
            anyhow::anyhow!(
                "provider '{}' not configured (available: {})",
                name,
                known.join(", ")
            )
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn client_settings(&self, model: &str) -> ClientSettings {
        ClientSettings {
            model: model.to_string(),
            temperature: self.default_temperature,
            max_tokens: self.max_tokens,
            system_prompt: None,
        }
    }

    pub fn assembler_config(&self) -> AssemblerConfig {
        AssemblerConfig {
            parallelism: self.parallelism,
            max_attempts_per_level: self.max_attempts_per_level,
            request_timeout: self.request_timeout(),
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Unset variables expand to the empty string.
fn resolve_env_vars(s: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        result.push_str(&lookup(&rest[start + 2..start + end]).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(
    config: &ProviderConfig,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> ProviderConfig {
    match config {
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url, lookup),
        },
        ProviderConfig::OpenAI { api_key, base_url } => ProviderConfig::OpenAI {
            api_key: api_key.as_ref().map(|k| resolve_env_vars(k, lookup)),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u, lookup)),
        },
        mock @ ProviderConfig::Mock { .. } => mock.clone(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `studyforge.toml` in the current directory
/// 2. `~/.config/studyforge/config.toml`
///
/// Environment variable overrides: `STUDYFORGE_OLLAMA_URL`,
/// `STUDYFORGE_OPENAI_KEY`, `STUDYFORGE_MODEL`.
pub fn load_config() -> Result<StudyforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<StudyforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("studyforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => StudyforgeConfig::default(),
    };

    Ok(finalize(config, &|name| std::env::var(name).ok()))
}

/// Parse a config document without applying overrides.
pub fn parse_config(content: &str) -> Result<StudyforgeConfig> {
    Ok(toml::from_str::<StudyforgeConfig>(content)?)
}

/// Apply env var overrides, expand `${VAR}` references and make sure an
/// `ollama` provider exists.
fn finalize(
    mut config: StudyforgeConfig,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> StudyforgeConfig {
    if let Some(url) = lookup("STUDYFORGE_OLLAMA_URL").filter(|u| !u.is_empty()) {
        config
            .providers
            .insert("ollama".into(), ProviderConfig::Ollama { base_url: url });
    }

    if let Some(key) = lookup("STUDYFORGE_OPENAI_KEY") {
        let entry = config
            .providers
            .entry("openai".into())
            .or_insert(ProviderConfig::OpenAI {
                api_key: None,
                base_url: None,
            });
        if let ProviderConfig::OpenAI { api_key, .. } = entry {
            *api_key = Some(key);
        }
    }

    if let Some(model) = lookup("STUDYFORGE_MODEL").filter(|m| !m.is_empty()) {
        config.default_model = model;
    }

    config
        .providers
        .entry("ollama".into())
        .or_insert_with(|| ProviderConfig::Ollama {
            base_url: default_ollama_url(),
        });

    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v, lookup)))
        .collect();

    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("studyforge"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(config: &ProviderConfig, timeout: Duration) -> Result<Arc<dyn LlmProvider>> {
    match config {
        ProviderConfig::Ollama { base_url } => Ok(Arc::new(
            OllamaProvider::new(base_url, timeout).context("failed to build Ollama client")?,
        )),
        ProviderConfig::OpenAI { api_key, base_url } => Ok(Arc::new(
            OpenAiProvider::new(api_key.clone(), base_url.clone(), timeout)
                .context("failed to build OpenAI client")?,
        )),
        ProviderConfig::Mock {
            responses,
            default_response,
        } => {
            let mut provider = MockProvider::new(responses.clone());
            if let Some(reply) = default_response {
                provider = provider.with_default(reply);
            }
            Ok(Arc::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn resolve_env_vars_basic() {
        let lookup = env(&[("COURSE_HOST", "gpu-box")]);
        assert_eq!(resolve_env_vars("${COURSE_HOST}", &lookup), "gpu-box");
        assert_eq!(
            resolve_env_vars("http://${COURSE_HOST}:11434/${MISSING}x", &lookup),
            "http://gpu-box:11434/x"
        );
        assert_eq!(resolve_env_vars("no refs ${unclosed", &lookup), "no refs ${unclosed");
    }

    #[test]
    fn default_config() {
        let config = finalize(StudyforgeConfig::default(), &env(&[]));
        assert_eq!(config.default_provider, "ollama");
        assert_eq!(config.default_model, "llama3.2");
        assert_eq!(config.default_temperature, 0.7);
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.max_chunk_chars, 6000);
        assert!(matches!(
            config.provider("ollama").unwrap(),
            ProviderConfig::Ollama { base_url } if base_url == "http://localhost:11434"
        ));
    }

    #[test]
    fn parse_provider_config() {
        let toml_str = r#"
default_provider = "lmstudio"
default_model = "qwen2.5-7b-instruct"
max_attempts_per_level = 5

[providers.lmstudio]
type = "openai"
base_url = "http://localhost:1234"

[providers.cloud]
type = "openai"
api_key = "${OPENAI_API_KEY}"

[providers.ollama]
type = "ollama"
base_url = "http://gpu-box:11434"
"#;
        let config = parse_config(toml_str).unwrap();
        let config = finalize(config, &env(&[("OPENAI_API_KEY", "sk-test")]));
        assert_eq!(config.providers.len(), 3);
        assert_eq!(config.max_attempts_per_level, 5);
        assert_eq!(config.assembler_config().max_attempts_per_level, 5);
        assert!(matches!(
            config.provider("lmstudio").unwrap(),
            ProviderConfig::OpenAI { api_key: None, .. }
        ));
        assert!(matches!(
            config.provider("cloud").unwrap(),
            ProviderConfig::OpenAI { api_key: Some(k), .. } if k == "sk-test"
        ));
    }

    #[test]
    fn env_overrides() {
        let config = finalize(
            StudyforgeConfig::default(),
            &env(&[
                ("STUDYFORGE_OLLAMA_URL", "http://10.0.0.5:11434"),
                ("STUDYFORGE_OPENAI_KEY", "sk-env"),
                ("STUDYFORGE_MODEL", "mistral"),
            ]),
        );
        assert_eq!(config.default_model, "mistral");
        assert!(matches!(
            config.provider("ollama").unwrap(),
            ProviderConfig::Ollama { base_url } if base_url == "http://10.0.0.5:11434"
        ));
        assert!(matches!(
            config.provider("openai").unwrap(),
            ProviderConfig::OpenAI { api_key: Some(k), .. } if k == "sk-env"
        ));
    }

    #[test]
    fn debug_masks_api_key() {
        let config = ProviderConfig::OpenAI {
            api_key: Some("sk-secret".into()),
            base_url: None,
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn unknown_provider_lists_known_ones() {
        let config = finalize(StudyforgeConfig::default(), &env(&[]));
        let err = config.provider("anthropic").unwrap_err();
        assert!(err.to_string().contains("available: ollama"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nope/studyforge.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studyforge.toml");
        std::fs::write(&path, "default_model = \"phi3\"\nparallelism = 2\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.parallelism, 2);
        assert!(config.providers.contains_key("ollama"));
    }

    #[tokio::test]
    async fn mock_provider_from_config() {
        let config = parse_config(
            r#"
[providers.dry]
type = "mock"
default_response = "canned"
"#,
        )
        .unwrap();
        let provider =
            create_provider(config.provider("dry").unwrap(), Duration::from_secs(1)).unwrap();
        assert_eq!(provider.name(), "mock");
        let models = provider.list_models().await.unwrap();
        assert_eq!(models.len(), 1);
    }
}
