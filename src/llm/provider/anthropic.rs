//! Anthropic Provider
//!
//! Messages API adapter. Content is either plain text or an array of typed
//! content blocks; tool calls and tool results travel as `tool_use` and
//! `tool_result` blocks.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::{
    CallContext, DelegateError, ErrorCategory, Message, ProviderError, Request, Response,
    Result, Role, Tool, ToolCall,
};
use crate::llm::http::{self, HttpReply, SendFailure};
use crate::llm::traits::Provider;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";
/// The Messages API rejects requests without a positive token limit
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Settings for [`AnthropicProvider::new`]
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    /// Empty selects [`DEFAULT_BASE_URL`]
    pub base_url: String,
}

/// Anthropic Messages API client
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: MessageContent,
}

/// Message content is plain text or a list of blocks depending on the turn
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    PlainText(String),
    ContentBlocks(Vec<ContentBlock>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Serialize)]
struct WireTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(DelegateError::config("anthropic provider requires an API key"));
        }
        let base_url = if config.base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            config.base_url
        };
        Ok(Self {
            client: http::build_client()?,
            api_key: config.api_key,
            base_url,
        })
    }

    fn build_body(request: &Request) -> MessagesRequest<'_> {
        MessagesRequest {
            model: &request.model,
            max_tokens: if request.max_tokens == 0 {
                DEFAULT_MAX_TOKENS
            } else {
                request.max_tokens
            },
            system: (!request.system.is_empty()).then_some(request.system.as_str()),
            messages: request
                .messages
                .iter()
                .filter_map(Self::to_wire_message)
                .collect(),
            temperature: (request.temperature != 0.0).then_some(request.temperature),
            tools: request.tools.iter().map(Self::to_wire_tool).collect(),
        }
    }

    /// System text travels in the top-level `system` field, never as a message
    fn to_wire_message(msg: &Message) -> Option<WireMessage> {
        let wire = match msg.role {
            Role::System => return None,
            Role::User => WireMessage {
                role: "user",
                content: MessageContent::PlainText(msg.content.clone()),
            },
            Role::Assistant if msg.tool_calls.is_empty() => WireMessage {
                role: "assistant",
                content: MessageContent::PlainText(msg.content.clone()),
            },
            Role::Assistant => {
                let mut blocks = Vec::with_capacity(msg.tool_calls.len() + 1);
                if !msg.content.is_empty() {
                    blocks.push(ContentBlock::Text {
                        text: msg.content.clone(),
                    });
                }
                blocks.extend(msg.tool_calls.iter().map(|call| ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.arguments_json(),
                }));
                WireMessage {
                    role: "assistant",
                    content: MessageContent::ContentBlocks(blocks),
                }
            }
            Role::Tool => WireMessage {
                role: "user",
                content: MessageContent::ContentBlocks(
                    msg.tool_results
                        .iter()
                        .map(|result| ContentBlock::ToolResult {
                            tool_use_id: result.call_id.clone(),
                            content: result.content.clone(),
                            is_error: result.is_error,
                        })
                        .collect(),
                ),
            },
        };
        Some(wire)
    }

    fn to_wire_tool(tool: &Tool) -> WireTool {
        WireTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.json_schema(),
        }
    }

    fn classify_status(status: u16) -> ErrorCategory {
        match status {
            401 => ErrorCategory::Auth,
            400 => ErrorCategory::BadRequest,
            429 => ErrorCategory::RateLimit,
            529 => ErrorCategory::Overloaded,
            _ => ErrorCategory::Server,
        }
    }

    fn status_error(reply: &HttpReply) -> ProviderError {
        let message = serde_json::from_str::<ErrorEnvelope>(&reply.body)
            .ok()
            .map(|envelope| envelope.error.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| http::status_phrase(reply.status));
        let status = reply.status.as_u16();
        ProviderError::new(Self::classify_status(status), status, message)
    }

    fn parse_response(reply: &HttpReply) -> std::result::Result<Response, ProviderError> {
        let parsed: MessagesResponse = http::decode_body("anthropic", reply)?;
        if parsed.content.is_empty() {
            return Err(ProviderError::new(
                ErrorCategory::Server,
                reply.status.as_u16(),
                "response contains no content",
            ));
        }

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for block in parsed.content {
            match block {
                ContentBlock::Text { text } => content.push_str(&text),
                ContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::new(id, name, ToolCall::flatten_arguments(&input)));
                }
                ContentBlock::ToolResult { .. } | ContentBlock::Unsupported => {}
            }
        }

        Ok(Response {
            content,
            model: parsed.model,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
            stop_reason: parsed.stop_reason.unwrap_or_default(),
            tool_calls,
        })
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn send(
        &self,
        ctx: &CallContext,
        request: &Request,
    ) -> std::result::Result<Response, ProviderError> {
        let body = Self::build_body(request);
        if let Ok(json) = serde_json::to_string(&body) {
            http::trace_body(self.name(), "Request", &json);
        }

        let builder = self
            .client
            .post(http::endpoint(&self.base_url, "/v1/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let reply = match http::send_json(ctx, builder).await {
            Ok(reply) => reply,
            Err(SendFailure::Interrupted(reason)) => {
                return Err(http::interrupted_error(self.name(), reason))
            }
            Err(SendFailure::Transport(e)) => return Err(http::transport_error(self.name(), e)),
        };
        http::trace_body(self.name(), "Response", &reply.body);

        if !reply.status.is_success() {
            return Err(Self::status_error(&reply));
        }
        Self::parse_response(&reply)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
