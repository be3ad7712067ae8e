//! Configuration management for Delegate
//!
//! Supports environment variables, a config file, and runtime overrides.
//! Environment variables are read once, inside [`Config::load`]; everything
//! downstream receives the resulting `Config` explicitly.
//!
//! Config file location: ~/.config/delegate/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{DelegateError, Result};
use crate::llm::provider::{self, ANTHROPIC, OLLAMA, OPENAI};

/// Default ceiling on nested sub-agent delegation
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Main configuration for Delegate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `<agent>.toml` definitions
    pub agents_dir: PathBuf,
    /// Directory for per-agent memory files
    pub memory_dir: PathBuf,
    /// Maximum sub-agent nesting depth
    pub max_depth: usize,
    /// Timeout applied to each sub-agent call that does not set its own
    pub sub_agent_timeout_secs: Option<u64>,
    /// Log swallowed failures (memory errors etc.)
    pub verbose: bool,
    /// Per-provider credentials and endpoints
    pub providers: ProvidersConfig,
}

/// Credentials and endpoints for each provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub anthropic: ProviderSettings,
    pub openai: ProviderSettings,
    pub ollama: ProviderSettings,
}

/// Settings for a single provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// API key (overridden by the provider's environment variable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override for self-hosted or test deployments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Credential lookup consumed by the sub-agent executor
pub trait CredentialResolver: Send + Sync {
    /// API key for `provider`, empty when none is configured
    fn resolve_api_key(&self, provider: &str) -> String;

    /// Base URL override for `provider`, empty when none is configured
    fn resolve_base_url(&self, provider: &str) -> String;

    /// Environment variable expected to hold the key for `provider`
    fn api_key_env_var(&self, provider: &str) -> Option<&'static str> {
        provider::api_key_env_var(provider)
    }
}

impl Default for Config {
    fn default() -> Self {
        let dir = Self::config_dir();
        Self {
            agents_dir: dir.join("agents"),
            memory_dir: dir.join("memory"),
            max_depth: DEFAULT_MAX_DEPTH,
            sub_agent_timeout_secs: None,
            verbose: false,
            providers: ProvidersConfig::default(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("delegate")
    }

    /// Get the default config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults.
    /// Priority: CLI args > env vars > config file > defaults
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let default_path = Self::config_file();
                if default_path.exists() {
                    Self::load_from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a TOML file only
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DelegateError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            DelegateError::config(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("ANTHROPIC_API_KEY") {
            self.providers.anthropic.api_key = Some(key);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.providers.openai.api_key = Some(key);
        }
        if let Some(url) = get("ANTHROPIC_BASE_URL") {
            self.providers.anthropic.base_url = Some(url);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.providers.openai.base_url = Some(url);
        }
        if let Some(host) = get("OLLAMA_HOST") {
            self.providers.ollama.base_url = Some(normalize_host(&host));
        }
        if let Some(dir) = get("DELEGATE_AGENTS_DIR") {
            self.agents_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("DELEGATE_MEMORY_DIR") {
            self.memory_dir = PathBuf::from(dir);
        }
        if let Some(depth) = get("DELEGATE_MAX_DEPTH").and_then(|d| d.parse().ok()) {
            self.max_depth = depth;
        }
    }

    /// Settings block for a provider name
    pub fn provider_settings(&self, provider: &str) -> Option<&ProviderSettings> {
        match provider {
            ANTHROPIC => Some(&self.providers.anthropic),
            OPENAI => Some(&self.providers.openai),
            OLLAMA => Some(&self.providers.ollama),
            _ => None,
        }
    }

    /// Default per-call sub-agent timeout
    pub fn sub_agent_timeout(&self) -> Option<Duration> {
        self.sub_agent_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl CredentialResolver for Config {
    fn resolve_api_key(&self, provider: &str) -> String {
        self.provider_settings(provider)
            .and_then(|s| s.api_key.clone())
            .unwrap_or_default()
    }

    fn resolve_base_url(&self, provider: &str) -> String {
        self.provider_settings(provider)
            .and_then(|s| s.base_url.clone())
            .unwrap_or_default()
    }
}

/// `OLLAMA_HOST` may be a bare `host:port`
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}
