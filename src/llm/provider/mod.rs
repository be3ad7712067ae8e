//! LLM Provider implementations and factory
//!
//! Submodules implement the hosted providers; the local Ollama client lives in
//! [`crate::llm::ollama`].

pub mod anthropic;
pub mod openai;

use std::sync::Arc;

use crate::core::{DelegateError, Result};
use crate::llm::ollama::{OllamaClient, OllamaConfig};
use crate::llm::traits::Provider;

use self::anthropic::{AnthropicConfig, AnthropicProvider};
use self::openai::{OpenAiConfig, OpenAiProvider};

pub const ANTHROPIC: &str = "anthropic";
pub const OPENAI: &str = "openai";
pub const OLLAMA: &str = "ollama";

/// Provider names accepted by [`create_provider`]
pub const SUPPORTED_PROVIDERS: [&str; 3] = [ANTHROPIC, OPENAI, OLLAMA];

/// Whether `provider` refuses to start without a credential
pub fn requires_api_key(provider: &str) -> bool {
    matches!(provider, ANTHROPIC | OPENAI)
}

/// Environment variable that conventionally holds `provider`'s API key
pub fn api_key_env_var(provider: &str) -> Option<&'static str> {
    match provider {
        ANTHROPIC => Some("ANTHROPIC_API_KEY"),
        OPENAI => Some("OPENAI_API_KEY"),
        _ => None,
    }
}

/// Create a provider by exact (case-sensitive) name.
///
/// An empty `base_url` keeps the provider's default endpoint.
pub fn create_provider(name: &str, api_key: &str, base_url: &str) -> Result<Arc<dyn Provider>> {
    let base_url = base_url.to_string();
    let provider: Arc<dyn Provider> = match name {
        ANTHROPIC => Arc::new(AnthropicProvider::new(AnthropicConfig {
            api_key: api_key.to_string(),
            base_url,
        })?),
        OPENAI => Arc::new(OpenAiProvider::new(OpenAiConfig {
            api_key: api_key.to_string(),
            base_url,
        })?),
        OLLAMA => Arc::new(OllamaClient::new(OllamaConfig { base_url })?),
        other => {
            return Err(DelegateError::config(format!(
                "unknown provider \"{}\" (supported: {})",
                other,
                SUPPORTED_PROVIDERS.join(", ")
            )))
        }
    };
    Ok(provider)
}

/// Constructs providers for the sub-agent executor
pub trait ProviderFactory: Send + Sync {
    fn create(&self, name: &str, api_key: &str, base_url: &str) -> Result<Arc<dyn Provider>>;
}

/// Factory backed by [`create_provider`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProviderFactory;

impl ProviderFactory for DefaultProviderFactory {
    fn create(&self, name: &str, api_key: &str, base_url: &str) -> Result<Arc<dyn Provider>> {
        create_provider(name, api_key, base_url)
    }
}
