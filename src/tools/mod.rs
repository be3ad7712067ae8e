//! Tools module - tool handlers the conversation engine can dispatch to
//!
//! The only built-in handler is `call_agent`, defined in
//! [`crate::agent::sub_agent`].

pub mod registry;

pub use registry::{ToolHandler, ToolRegistry};
