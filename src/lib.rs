//! Delegate - multi-provider LLM client with sub-agent delegation
//!
//! Sends chat requests to Anthropic, OpenAI or a local Ollama server through
//! one request/response model, and lets a model hand sub-tasks to other
//! configured agents through the `call_agent` tool.
//!
//! # Architecture
//!
//! - **Core**: Shared types, execution context, configuration, and error handling
//! - **LLM**: Provider adapters and the factory that selects one by name
//! - **Tools**: Tool handler trait and registry
//! - **Agent**: Conversation engine, agent definitions, memory and delegation
//! - **CLI**: Command-line interface
//!
//! # Usage
//!
//! ```rust,no_run
//! use delegate::agent::{CallOptions, SubAgentExecutor};
//! use delegate::core::{CallContext, Config};
//!
//! #[tokio::main]
//! async fn main() -> delegate::Result<()> {
//!     let config = Config::load(None)?;
//!     let executor = SubAgentExecutor::from_config(&config);
//!     let options = CallOptions {
//!         max_depth: config.max_depth,
//!         ..Default::default()
//!     };
//!
//!     let response = executor
//!         .run_agent(&CallContext::new(), "researcher", "Summarize RFC 9110", "", &options)
//!         .await?;
//!     println!("{}", response.content);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod tools;

// Re-export commonly used items
pub use agent::SubAgentExecutor;
pub use core::{CallContext, Config, DelegateError, ErrorCategory, ProviderError, Result};
