pub mod anthropic;
pub mod error;
pub mod openai;
pub mod provider;

pub use anthropic::AnthropicClient;
pub use error::{LlmError, LlmResult};
pub use openai::OpenAiClient;
pub use provider::ChatModel;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Chat completion vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Anthropic,
    OpenAi,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::OpenAi => "openai",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(LlmProvider::Anthropic),
            "openai" => Ok(LlmProvider::OpenAi),
            other => Err(LlmError::ProviderNotConfigured(other.to_string())),
        }
    }
}

/// Credentials and endpoint for one provider
#[derive(Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Request shaping shared by every provider
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
    pub retry_backoff: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_tokens: 2048,
            temperature: 0.7,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

/// Configuration for LLM access
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub default_provider: LlmProvider,
    pub anthropic: Option<ProviderSettings>,
    pub openai: Option<ProviderSettings>,
    pub generation: GenerationSettings,
}

impl LlmConfig {
    /// Load from environment. A provider is configured when its API key is set.
    pub fn from_env() -> anyhow::Result<Self> {
        let default_provider = std::env::var("LLM_PROVIDER")
            .unwrap_or_else(|_| "anthropic".to_string())
            .parse::<LlmProvider>()
            .context("LLM_PROVIDER must be 'anthropic' or 'openai'")?;

        let anthropic = non_empty_env("ANTHROPIC_API_KEY").map(|api_key| ProviderSettings {
            api_key,
            model: std::env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-3-5-sonnet-latest".to_string()),
            base_url: std::env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
        });

        let openai = non_empty_env("OPENAI_API_KEY").map(|api_key| ProviderSettings {
            api_key,
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
        });

        let defaults = GenerationSettings::default();
        let generation = GenerationSettings {
            timeout: Duration::from_secs(
                std::env::var("LLM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| defaults.timeout.as_secs().to_string())
                    .parse()
                    .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            max_tokens: std::env::var("LLM_MAX_TOKENS")
                .unwrap_or_else(|_| defaults.max_tokens.to_string())
                .parse()
                .context("LLM_MAX_TOKENS must be a positive integer")?,
            temperature: std::env::var("LLM_TEMPERATURE")
                .unwrap_or_else(|_| defaults.temperature.to_string())
                .parse()
                .context("LLM_TEMPERATURE must be a number")?,
            retry_backoff: defaults.retry_backoff,
        };

        Ok(Self {
            default_provider,
            anthropic,
            openai,
            generation,
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// The chat models available to this process, keyed by provider.
#[derive(Clone)]
pub struct ModelRegistry {
    default_provider: LlmProvider,
    models: HashMap<LlmProvider, Arc<dyn ChatModel>>,
}

impl ModelRegistry {
    pub fn new(default_provider: LlmProvider) -> Self {
        Self {
            default_provider,
            models: HashMap::new(),
        }
    }

    pub fn with_model(mut self, provider: LlmProvider, model: Arc<dyn ChatModel>) -> Self {
        self.models.insert(provider, model);
        self
    }

    /// Build HTTP clients for every provider that has credentials.
    pub fn from_config(config: &LlmConfig) -> LlmResult<Self> {
        let mut registry = Self::new(config.default_provider);

        if let Some(settings) = &config.anthropic {
            let client = AnthropicClient::new(settings.clone(), config.generation.clone())?;
            registry = registry.with_model(LlmProvider::Anthropic, Arc::new(client));
        }
        if let Some(settings) = &config.openai {
            let client = OpenAiClient::new(settings.clone(), config.generation.clone())?;
            registry = registry.with_model(LlmProvider::OpenAi, Arc::new(client));
        }

        if !registry.models.contains_key(&config.default_provider) {
            tracing::warn!(
                provider = %config.default_provider,
                "Default LLM provider has no API key; requests must name a configured provider"
            );
        }

        Ok(registry)
    }

    /// The model for `provider`, or the default provider's model.
    pub fn resolve(&self, provider: Option<LlmProvider>) -> LlmResult<Arc<dyn ChatModel>> {
        let provider = provider.unwrap_or(self.default_provider);
        self.models
            .get(&provider)
            .cloned()
            .ok_or_else(|| LlmError::ProviderNotConfigured(provider.to_string()))
    }

    pub fn default_provider(&self) -> LlmProvider {
        self.default_provider
    }

    pub fn configured(&self) -> Vec<LlmProvider> {
        let mut providers: Vec<_> = self.models.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ChatModel for Echo {
        async fn complete(&self, _system: &str, user: &str) -> LlmResult<String> {
            Ok(user.to_string())
        }

        fn backend_name(&self) -> &'static str {
            "echo"
        }
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenAI".parse::<LlmProvider>().unwrap(), LlmProvider::OpenAi);
        assert_eq!("anthropic".parse::<LlmProvider>().unwrap(), LlmProvider::Anthropic);
        assert!("mistral".parse::<LlmProvider>().is_err());
    }

    #[tokio::test]
    async fn test_registry_resolves_default_and_named() {
        let registry = ModelRegistry::new(LlmProvider::Anthropic)
            .with_model(LlmProvider::Anthropic, Arc::new(Echo));

        let model = registry.resolve(None).unwrap();
        assert_eq!(model.complete("s", "hi").await.unwrap(), "hi");

        let err = registry.resolve(Some(LlmProvider::OpenAi)).err().unwrap();
        assert!(matches!(err, LlmError::ProviderNotConfigured(p) if p == "openai"));
        assert_eq!(registry.configured(), vec![LlmProvider::Anthropic]);
    }

    #[test]
    fn test_settings_debug_masks_key() {
        let settings = ProviderSettings {
            api_key: "sk-very-secret".into(),
            model: "m".into(),
            base_url: "http://x".into(),
        };
        assert!(!format!("{:?}", settings).contains("sk-very-secret"));
    }
}
