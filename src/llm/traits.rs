//! LLM Provider trait for abstracting different backends
//!
//! Every adapter translates the unified [`Request`] into its vendor's wire
//! format and the vendor's reply back into a [`Response`] or a categorized
//! [`ProviderError`].

use async_trait::async_trait;

use crate::core::{CallContext, ProviderError, Request, Response};

/// Trait for LLM providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send one request and wait for the complete response
    async fn send(&self, ctx: &CallContext, request: &Request)
        -> Result<Response, ProviderError>;

    /// Get the provider name
    fn name(&self) -> &str;
}
