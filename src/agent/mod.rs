//! Agent module - conversations and delegation
//!
//! Contains the conversation engine, agent definitions, persistent memory and
//! the sub-agent executor behind the `call_agent` tool.

pub mod conversation;
pub mod definition;
pub mod memory;
pub mod sub_agent;

pub use conversation::{Conversation, MAX_TURNS};
pub use definition::{AgentDefinition, AgentSource, DirectoryAgentSource, InMemoryAgentSource};
pub use memory::{Clock, JsonlMemoryStore, MemoryStore, SystemClock};
pub use sub_agent::{CallAgentTool, CallOptions, SubAgentExecutor, SubAgentExecutorBuilder};
