//! Tool registry - manages and dispatches tool calls
//!
//! Central hub for registering tool handlers and routing tool calls to them.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{CallContext, Tool, ToolCall, ToolResult};

/// A tool the conversation engine can execute between turns
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Declaration offered to the model
    fn definition(&self) -> Tool;

    /// Execute one call. Failures are reported in-band as error results.
    async fn execute(&self, ctx: &CallContext, call: &ToolCall) -> ToolResult;
}

/// Registry of available tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    /// Handlers indexed by tool name
    handlers: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its declared name, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.definition().name;
        self.handlers.insert(name, handler);
    }

    /// Check if a tool is registered
    pub fn has_tool(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Declarations of every registered tool, in name order
    pub fn definitions(&self) -> Vec<Tool> {
        self.handlers.values().map(|h| h.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Execute a tool call; unknown names produce an error result
    pub async fn execute(&self, ctx: &CallContext, call: &ToolCall) -> ToolResult {
        match self.handlers.get(&call.name) {
            Some(handler) => handler.execute(ctx, call).await,
            None => {
                tracing::debug!(tool = %call.name, "model requested an unknown tool");
                ToolResult::error(&call.id, format!("Unknown tool: \"{}\"", call.name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        fn definition(&self) -> Tool {
            Tool::new("echo", "Echo the input")
        }

        async fn execute(&self, _ctx: &CallContext, call: &ToolCall) -> ToolResult {
            let text = call.get_string("text").unwrap_or_default();
            ToolResult::success(&call.id, text)
        }
    }

    #[tokio::test]
    async fn test_dispatch() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        assert!(registry.has_tool("echo"));
        assert_eq!(registry.definitions()[0].name, "echo");

        let mut args = BTreeMap::new();
        args.insert("text".to_string(), "hi".to_string());
        let result = registry
            .execute(&CallContext::new(), &ToolCall::new("c1", "echo", args))
            .await;
        assert_eq!(result, ToolResult::success("c1", "hi"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let result = registry
            .execute(
                &CallContext::new(),
                &ToolCall::new("c9", "X", BTreeMap::new()),
            )
            .await;
        assert!(result.is_error);
        assert_eq!(result.call_id, "c9");
        assert_eq!(result.content, "Unknown tool: \"X\"");
    }
}
