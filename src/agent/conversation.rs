//! Conversation engine
//!
//! Drives a bounded multi-turn exchange over one provider: send the request,
//! run any requested tools in order, append the results, and send again until
//! the model answers without tool calls.

use std::sync::Arc;

use crate::core::{CallContext, DelegateError, Message, Request, Response, Result};
use crate::llm::Provider;
use crate::tools::ToolRegistry;

/// Turn ceiling for a single conversation
pub const MAX_TURNS: usize = 50;

/// A tool-calling conversation bound to one provider
#[derive(Clone)]
pub struct Conversation {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    max_turns: usize,
}

impl Conversation {
    /// Create a new conversation
    pub fn new(provider: Arc<dyn Provider>, tools: ToolRegistry) -> Self {
        Self {
            provider,
            tools,
            max_turns: MAX_TURNS,
        }
    }

    /// Override the turn ceiling
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Run the conversation to a final response.
    ///
    /// `request.messages` grows by one assistant message and one tool-result
    /// message per tool-calling turn. Provider failures end the conversation
    /// unchanged; tool failures are fed back to the model.
    pub async fn run(&self, ctx: &CallContext, request: &mut Request) -> Result<Response> {
        for turn in 1..=self.max_turns {
            tracing::debug!(
                provider = self.provider.name(),
                model = %request.model,
                turn,
                max_turns = self.max_turns,
                "sending request"
            );
            let response = self.provider.send(ctx, request).await?;

            // A tool call is only honoured when tools were actually offered
            if response.tool_calls.is_empty() || !request.has_tools() {
                tracing::debug!(
                    turn,
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "conversation finished"
                );
                return Ok(response);
            }

            request.messages.push(Message::assistant_with_tool_calls(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            let mut results = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                tracing::debug!(turn, tool = %call.name, id = %call.id, "executing tool call");
                results.push(self.tools.execute(ctx, call).await);
            }
            request.messages.push(Message::tool_results(results));
        }

        Err(DelegateError::MaxTurns(self.max_turns))
    }
}
