//! Core module - shared infrastructure for Delegate
//!
//! This module contains the unified data model, the execution context,
//! configuration, and error handling used throughout the crate.

pub mod config;
pub mod context;
pub mod error;
pub mod types;

pub use config::{Config, CredentialResolver};
pub use context::{CallContext, Interrupted};
pub use error::{DelegateError, ErrorCategory, ProviderError, Result};
pub use types::*;
