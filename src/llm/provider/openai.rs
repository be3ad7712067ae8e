//! OpenAI Provider
//!
//! Chat Completions adapter. Tool calls carry JSON-string-encoded arguments
//! and every tool result is its own `tool` message linked by `tool_call_id`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::{
    CallContext, DelegateError, ErrorCategory, Message, ProviderError, Request, Response,
    Result, Role, Tool, ToolCall,
};
use crate::llm::http::{self, HttpReply, SendFailure};
use crate::llm::traits::Provider;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Settings for [`OpenAiProvider::new`]
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// Empty selects [`DEFAULT_BASE_URL`]
    pub base_url: String,
}

/// OpenAI Chat Completions client
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    /// `null` for assistant turns that only call tools
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl WireMessage {
    fn text(role: &'static str, content: &str) -> Self {
        Self {
            role,
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default, deserialize_with = "http::null_as_default")]
    model: String,
    #[serde(default, deserialize_with = "http::null_as_default")]
    choices: Vec<Choice>,
    #[serde(default, deserialize_with = "http::null_as_default")]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default, deserialize_with = "http::null_as_default")]
    prompt_tokens: u32,
    #[serde(default, deserialize_with = "http::null_as_default")]
    completion_tokens: u32,
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

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(DelegateError::config("openai provider requires an API key"));
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

    fn build_body(request: &Request) -> ChatRequest<'_> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(WireMessage::text("system", &request.system));
        }
        for msg in &request.messages {
            Self::push_wire_messages(msg, &mut messages);
        }

        ChatRequest {
            model: &request.model,
            messages,
            temperature: (request.temperature != 0.0).then_some(request.temperature),
            max_tokens: (request.max_tokens != 0).then_some(request.max_tokens),
            tools: request.tools.iter().map(Self::to_wire_tool).collect(),
        }
    }

    fn push_wire_messages(msg: &Message, out: &mut Vec<WireMessage>) {
        match msg.role {
            Role::System => out.push(WireMessage::text("system", &msg.content)),
            Role::User => out.push(WireMessage::text("user", &msg.content)),
            Role::Assistant => out.push(WireMessage {
                role: "assistant",
                content: (!msg.content.is_empty()).then(|| msg.content.clone()),
                tool_calls: msg
                    .tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone(),
                        kind: function_type(),
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: call.arguments_json().to_string(),
                        },
                    })
                    .collect(),
                tool_call_id: None,
            }),
            Role::Tool => out.extend(msg.tool_results.iter().map(|result| WireMessage {
                role: "tool",
                content: Some(result.content.clone()),
                tool_calls: Vec::new(),
                tool_call_id: Some(result.call_id.clone()),
            })),
        }
    }

    fn to_wire_tool(tool: &Tool) -> WireTool {
        WireTool {
            kind: "function",
            function: WireFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.json_schema(),
            },
        }
    }

    /// Undecodable arguments become an empty mapping
    fn decode_arguments(raw: &str) -> std::collections::BTreeMap<String, String> {
        serde_json::from_str::<serde_json::Value>(raw)
            .map(|value| ToolCall::flatten_arguments(&value))
            .unwrap_or_default()
    }

    fn classify_status(status: u16) -> ErrorCategory {
        match status {
            401 | 403 => ErrorCategory::Auth,
            400 | 404 => ErrorCategory::BadRequest,
            429 => ErrorCategory::RateLimit,
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
        let parsed: ChatResponse = http::decode_body("openai", reply)?;
        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(ProviderError::new(
                ErrorCategory::Server,
                reply.status.as_u16(),
                "response contains no choices",
            ));
        };

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let arguments = Self::decode_arguments(&call.function.arguments);
                ToolCall::new(call.id, call.function.name, arguments)
            })
            .collect();

        Ok(Response {
            content: choice.message.content.unwrap_or_default(),
            model: parsed.model,
            input_tokens: parsed.usage.prompt_tokens,
            output_tokens: parsed.usage.completion_tokens,
            stop_reason: choice.finish_reason.unwrap_or_default(),
            tool_calls,
        })
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
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
            .post(http::endpoint(&self.base_url, "/v1/chat/completions"))
            .bearer_auth(&self.api_key)
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
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ToolParam, ToolResult};
    use reqwest::StatusCode;
    use std::collections::BTreeMap;

    fn body_json(request: &Request) -> serde_json::Value {
        serde_json::to_value(OpenAiProvider::build_body(request)).unwrap()
    }

    fn reply(status: u16, body: &str) -> HttpReply {
        HttpReply {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_requires_api_key() {
        let result = OpenAiProvider::new(OpenAiConfig {
            api_key: String::new(),
            base_url: String::new(),
        });
        assert!(matches!(result, Err(DelegateError::Config(_))));
    }

    #[test]
    fn test_omissions() {
        let mut request = Request::new("gpt-4o");
        request.messages.push(Message::user("hi"));
        let body = body_json(&request);

        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_system_prompt_is_leading_message() {
        let mut request = Request::new("gpt-4o");
        request.system = "You are terse.".into();
        request.temperature = 0.7;
        request.max_tokens = 300;
        request.messages.push(Message::user("hi"));
        let body = body_json(&request);

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are terse.");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 300);
    }

    #[test]
    fn test_tool_declaration_uses_function_envelope() {
        let mut request = Request::new("gpt-4o");
        request.tools.push(
            Tool::new("lookup", "Look up").param("q", ToolParam::string("Query", false)),
        );
        let body = body_json(&request);
        let tool = &body["tools"][0];

        assert_eq!(tool["type"], "function");
        assert_eq!(tool["function"]["name"], "lookup");
        assert_eq!(tool["function"]["parameters"]["properties"]["q"]["type"], "string");
        assert!(tool["function"]["parameters"].get("required").is_none());
    }

    #[test]
    fn test_tool_turn_messages() {
        let mut args = BTreeMap::new();
        args.insert("agent".to_string(), "helper".to_string());
        let mut request = Request::new("gpt-4o");
        request.messages.push(Message::assistant_with_tool_calls(
            "",
            vec![
                ToolCall::new("call_a", "call_agent", args.clone()),
                ToolCall::new("call_b", "call_agent", args),
            ],
        ));
        request.messages.push(Message::tool_results(vec![
            ToolResult::success("call_a", "one"),
            ToolResult::error("call_b", "two"),
        ]));
        let body = body_json(&request);
        let messages = body["messages"].as_array().unwrap();

        assert_eq!(messages.len(), 3);
        assert!(messages[0]["content"].is_null());
        assert_eq!(messages[0]["tool_calls"][0]["type"], "function");
        let encoded = messages[0]["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .unwrap();
        assert_eq!(encoded, r#"{"agent":"helper"}"#);
        assert_eq!(messages[1]["role"], "tool");
        assert_eq!(messages[1]["tool_call_id"], "call_a");
        assert_eq!(messages[2]["tool_call_id"], "call_b");
        assert_eq!(messages[2]["content"], "two");
    }

    #[test]
    fn test_parse_tool_calls_with_bad_arguments() {
        let response = OpenAiProvider::parse_response(&reply(
            200,
            r#"{"model":"gpt-4o","choices":[{"finish_reason":"tool_calls","message":{"content":null,
                "tool_calls":[{"id":"call_1","type":"function","function":{"name":"call_agent","arguments":"{\"agent\":\"helper\"}"}},
                              {"id":"call_2","type":"function","function":{"name":"call_agent","arguments":"{not json"}}]}}],
                "usage":{"prompt_tokens":5,"completion_tokens":3}}"#,
        ))
        .unwrap();

        assert_eq!(response.content, "");
        assert_eq!(response.stop_reason, "tool_calls");
        assert_eq!(response.tool_calls.len(), 2);
        assert_eq!(response.tool_calls[0].arguments["agent"], "helper");
        assert!(response.tool_calls[1].arguments.is_empty());
        assert_eq!(response.output_tokens, 3);
    }

    #[test]
    fn test_null_usage_and_tool_calls_accepted() {
        let response = OpenAiProvider::parse_response(&reply(
            200,
            r#"{"model":null,"choices":[{"message":{"content":"hi","tool_calls":null}}],"usage":null}"#,
        ))
        .unwrap();

        assert_eq!(response.content, "hi");
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.input_tokens, 0);
        assert_eq!(response.output_tokens, 0);
    }

    #[test]
    fn test_no_choices_is_server_error() {
        let err = OpenAiProvider::parse_response(&reply(200, r#"{"model":"gpt-4o","choices":[]}"#))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Server);
        assert_eq!(err.message(), "response contains no choices");
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(OpenAiProvider::classify_status(401), ErrorCategory::Auth);
        assert_eq!(OpenAiProvider::classify_status(403), ErrorCategory::Auth);
        assert_eq!(OpenAiProvider::classify_status(404), ErrorCategory::BadRequest);
        assert_eq!(OpenAiProvider::classify_status(429), ErrorCategory::RateLimit);
        assert_eq!(OpenAiProvider::classify_status(502), ErrorCategory::Server);
    }

    #[test]
    fn test_error_message_extraction() {
        let err = OpenAiProvider::status_error(&reply(
            401,
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        ));
        assert_eq!(err.category(), ErrorCategory::Auth);
        assert_eq!(err.message(), "Incorrect API key provided");
    }
}
