//! Error types for Delegate
//!
//! `ProviderError` is the categorized error produced at the adapter boundary.
//! `DelegateError` wraps it together with everything that can go wrong above
//! that boundary (configuration, agent definitions, memory, turn limits).

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Category of a provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing or rejected credentials
    Auth,
    /// Provider rate limit hit
    RateLimit,
    /// Cancelled or expired context, or transport timeout
    Timeout,
    /// Provider temporarily overloaded
    Overloaded,
    /// The request was rejected as malformed
    BadRequest,
    /// Provider-side or unclassified failure
    Server,
}

impl ErrorCategory {
    /// Process exit code for a top-level failure of this category
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorCategory::Auth => 3,
            ErrorCategory::RateLimit => 4,
            ErrorCategory::Timeout => 5,
            ErrorCategory::Overloaded => 6,
            ErrorCategory::BadRequest => 7,
            ErrorCategory::Server => 8,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Auth => write!(f, "auth"),
            ErrorCategory::RateLimit => write!(f, "rate_limit"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::Overloaded => write!(f, "overloaded"),
            ErrorCategory::BadRequest => write!(f, "bad_request"),
            ErrorCategory::Server => write!(f, "server"),
        }
    }
}

/// A categorized provider failure.
///
/// Built once at the adapter boundary and never mutated afterwards.
#[derive(Debug)]
pub struct ProviderError {
    category: ErrorCategory,
    status: u16,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Create an error with an HTTP status (0 when not applicable)
    pub fn new(category: ErrorCategory, status: u16, message: impl Into<String>) -> Self {
        Self {
            category,
            status,
            message: message.into(),
            source: None,
        }
    }

    /// Create an error that wraps an underlying cause
    pub fn with_source<E>(
        category: ErrorCategory,
        status: u16,
        message: impl Into<String>,
        source: E,
    ) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            category,
            status,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a server-category error without a status
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Server, 0, message)
    }

    /// Create a timeout-category error without a status
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Timeout, 0, message)
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// HTTP status, 0 if the failure never reached HTTP
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status == 0 {
            write!(f, "{} error: {}", self.category, self.message)
        } else {
            write!(
                f,
                "{} error (HTTP {}): {}",
                self.category, self.status, self.message
            )
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Main error type for Delegate operations
#[derive(Error, Debug)]
pub enum DelegateError {
    /// Categorized provider failure
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Configuration errors (unknown provider, missing credentials, bad flags)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Agent definition could not be loaded or resolved
    #[error("Agent error: {0}")]
    Agent(String),

    /// Persistent memory read/write failure
    #[error("Memory error: {0}")]
    Memory(String),

    /// The conversation never reached a final answer
    #[error("exceeded maximum conversation turns ({0})")]
    MaxTurns(usize),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience Result type for Delegate operations
pub type Result<T> = std::result::Result<T, DelegateError>;

impl DelegateError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an agent definition error
    pub fn agent(msg: impl Into<String>) -> Self {
        Self::Agent(msg.into())
    }

    /// Create a memory error
    pub fn memory(msg: impl Into<String>) -> Self {
        Self::Memory(msg.into())
    }

    /// Wrap an error with additional context
    pub fn with_context<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Category of the underlying provider failure, if any
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            DelegateError::Provider(e) => Some(e.category()),
            _ => None,
        }
    }

    /// Process exit code for this error when it ends a top-level call
    pub fn exit_code(&self) -> u8 {
        match self {
            DelegateError::Provider(e) => e.category().exit_code(),
            DelegateError::Config(_) | DelegateError::Agent(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "rate_limit");
        assert_eq!(ErrorCategory::BadRequest.to_string(), "bad_request");
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new(ErrorCategory::Auth, 401, "invalid x-api-key");
        assert_eq!(err.to_string(), "auth error (HTTP 401): invalid x-api-key");

        let err = ProviderError::timeout("context deadline exceeded");
        assert_eq!(err.to_string(), "timeout error: context deadline exceeded");
    }

    #[test]
    fn test_provider_error_source() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = ProviderError::with_source(ErrorCategory::Server, 0, "request failed", io);
        assert!(err.source().is_some());
        assert!(ProviderError::server("x").source().is_none());
    }

    #[test]
    fn test_exit_codes() {
        let err: DelegateError = ProviderError::new(ErrorCategory::Overloaded, 529, "busy").into();
        assert_eq!(err.category(), Some(ErrorCategory::Overloaded));
        assert_eq!(err.exit_code(), 6);
        assert_eq!(DelegateError::config("bad").exit_code(), 2);
        assert_eq!(DelegateError::MaxTurns(50).exit_code(), 1);
    }

    #[test]
    fn test_max_turns_message() {
        assert_eq!(
            DelegateError::MaxTurns(50).to_string(),
            "exceeded maximum conversation turns (50)"
        );
    }
}
