//! LLM module - Language Model integrations
//!
//! Adapters for Anthropic, OpenAI and Ollama behind one [`Provider`] trait,
//! plus the factory that picks one by name.

pub(crate) mod http;
pub mod ollama;
pub mod provider;
pub mod traits;

pub use ollama::OllamaClient;
pub use provider::{create_provider, DefaultProviderFactory, ProviderFactory};
pub use traits::Provider;
