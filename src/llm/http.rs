//! HTTP plumbing shared by the provider adapters
//!
//! Runs a single JSON exchange under a [`CallContext`] and turns the
//! transport-level outcomes into the pieces each adapter classifies itself.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::core::{
    CallContext, DelegateError, ErrorCategory, Interrupted, ProviderError, Result,
};

/// Longest body excerpt written to trace logs
const TRACE_LIMIT: usize = 2000;

/// Raw reply from a provider endpoint
#[derive(Debug)]
pub(crate) struct HttpReply {
    pub status: StatusCode,
    pub body: String,
}

/// Why an exchange produced no reply
#[derive(Debug)]
pub(crate) enum SendFailure {
    Interrupted(Interrupted),
    Transport(reqwest::Error),
}

/// Read an explicit JSON `null` as the field's default.
///
/// Self-hosted OpenAI-compatible servers send `"usage": null` and
/// `"tool_calls": null` where the hosted APIs omit the key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Build the HTTP client every adapter uses
pub(crate) fn build_client() -> Result<Client> {
    Client::builder()
        .build()
        .map_err(|e| DelegateError::with_context("Failed to create HTTP client", e))
}

/// Send `builder` and read the whole body, unless `ctx` finishes first.
///
/// A transport error that races with cancellation is reported as an
/// interruption so callers classify it as a timeout.
pub(crate) async fn send_json(
    ctx: &CallContext,
    builder: RequestBuilder,
) -> std::result::Result<HttpReply, SendFailure> {
    let exchange = async {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok::<_, reqwest::Error>(HttpReply { status, body })
    };

    match ctx.run(exchange).await {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(e)) => match ctx.interrupted() {
            Some(reason) => Err(SendFailure::Interrupted(reason)),
            None => Err(SendFailure::Transport(e)),
        },
        Err(reason) => Err(SendFailure::Interrupted(reason)),
    }
}

/// Timeout-category error for an aborted exchange
pub(crate) fn interrupted_error(provider: &str, reason: Interrupted) -> ProviderError {
    ProviderError::with_source(
        ErrorCategory::Timeout,
        0,
        format!("{} request aborted: {}", provider, reason),
        reason,
    )
}

/// Default classification of a transport failure
pub(crate) fn transport_error(provider: &str, error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        let message = format!("{} request timed out", provider);
        return ProviderError::with_source(ErrorCategory::Timeout, 0, message, error);
    }
    let message = format!("{} request failed: {}", provider, error);
    ProviderError::with_source(ErrorCategory::Server, 0, message, error)
}

/// Generic phrase for a status when the body carries no usable message
pub(crate) fn status_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP status {}", status.as_u16()))
}

/// Decode a successful response body
pub(crate) fn decode_body<T: DeserializeOwned>(
    provider: &str,
    reply: &HttpReply,
) -> std::result::Result<T, ProviderError> {
    serde_json::from_str(&reply.body).map_err(|e| {
        ProviderError::with_source(
            ErrorCategory::Server,
            reply.status.as_u16(),
            format!("failed to decode {} response: {}", provider, e),
            e,
        )
    })
}

/// Trace-log a body, truncated to keep logs readable
pub(crate) fn trace_body(provider: &str, label: &str, body: &str) {
    if body.len() > TRACE_LIMIT {
        let mut end = TRACE_LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        tracing::trace!(provider = provider, "{}: {}...", label, &body[..end]);
    } else {
        tracing::trace!(provider = provider, "{}: {}", label, body);
    }
}

/// Join a base URL and an endpoint path without doubling slashes
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
