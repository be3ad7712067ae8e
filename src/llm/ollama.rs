//! Ollama client implementation
//!
//! Non-streaming client for the Ollama `/api/chat` endpoint. Ollama has no
//! tool-call ids on the wire: results are matched by order, and the client
//! synthesizes `ollama_<index>` ids for the unified model.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::{
    CallContext, ErrorCategory, Message, ProviderError, Request, Response, Result, Role, Tool,
    ToolCall,
};
use crate::llm::http::{self, HttpReply, SendFailure};
use crate::llm::traits::Provider;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Settings for [`OllamaClient::new`]
#[derive(Debug, Clone, Default)]
pub struct OllamaConfig {
    /// Empty selects [`DEFAULT_BASE_URL`]
    pub base_url: String,
}

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default, deserialize_with = "http::null_as_default")]
    content: String,
    #[serde(
        default,
        deserialize_with = "http::null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    tool_calls: Vec<OllamaToolCall>,
}

/// Ollama tool call format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

/// Ollama function in tool call; arguments stay a JSON object
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: OllamaToolFunction,
}

#[derive(Debug, Serialize)]
struct OllamaToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default, deserialize_with = "http::null_as_default")]
    model: String,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let base_url = if config.base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            config.base_url
        };
        Ok(Self {
            client: http::build_client()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_body(request: &Request) -> ChatRequest<'_> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !request.system.is_empty() {
            messages.push(Self::text_message(Role::System, &request.system));
        }
        for msg in &request.messages {
            Self::push_ollama_messages(msg, &mut messages);
        }

        let temperature = (request.temperature != 0.0).then_some(request.temperature);
        let num_predict = (request.max_tokens != 0).then_some(request.max_tokens);
        let options = (temperature.is_some() || num_predict.is_some()).then_some(OllamaOptions {
            temperature,
            num_predict,
        });

        ChatRequest {
            model: &request.model,
            messages,
            stream: false,
            tools: request.tools.iter().map(Self::to_ollama_tool).collect(),
            options,
        }
    }

    fn text_message(role: Role, content: &str) -> OllamaMessage {
        OllamaMessage {
            role: role.as_str().to_string(),
            content: content.to_string(),
            tool_calls: Vec::new(),
        }
    }

    /// Convert internal Message to Ollama format.
    /// Tool results lose their call ids; Ollama relies on order.
    fn push_ollama_messages(msg: &Message, out: &mut Vec<OllamaMessage>) {
        match msg.role {
            Role::Tool => out.extend(
                msg.tool_results
                    .iter()
                    .map(|result| Self::text_message(Role::Tool, &result.content)),
            ),
            role => out.push(OllamaMessage {
                role: role.as_str().to_string(),
                content: msg.content.clone(),
                tool_calls: msg
                    .tool_calls
                    .iter()
                    .map(|tc| OllamaToolCall {
                        function: OllamaFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments_json(),
                        },
                    })
                    .collect(),
            }),
        }
    }

    fn to_ollama_tool(tool: &Tool) -> OllamaTool {
        OllamaTool {
            kind: "function",
            function: OllamaToolFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.json_schema(),
            },
        }
    }

    fn classify_status(status: u16) -> ErrorCategory {
        match status {
            400 | 404 => ErrorCategory::BadRequest,
            _ => ErrorCategory::Server,
        }
    }

    fn status_error(reply: &HttpReply) -> ProviderError {
        let message = serde_json::from_str::<ErrorEnvelope>(&reply.body)
            .ok()
            .map(|envelope| envelope.error)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| http::status_phrase(reply.status));
        let status = reply.status.as_u16();
        ProviderError::new(Self::classify_status(status), status, message)
    }

    fn transport_error(&self, error: reqwest::Error) -> ProviderError {
        if error.is_connect() && is_connection_refused(&error) {
            let message = format!(
                "cannot connect to Ollama at {}: is Ollama running? (start it with `ollama serve`)",
                self.base_url
            );
            return ProviderError::with_source(ErrorCategory::Server, 0, message, error);
        }
        http::transport_error(self.name(), error)
    }

    /// Convert Ollama response to the unified Response
    fn to_response(reply: &HttpReply) -> std::result::Result<Response, ProviderError> {
        let parsed: ChatResponse = http::decode_body("ollama", reply)?;
        let Some(message) = parsed.message else {
            return Err(ProviderError::new(
                ErrorCategory::Server,
                reply.status.as_u16(),
                "response contains no message",
            ));
        };

        let tool_calls = message
            .tool_calls
            .into_iter()
            .enumerate()
            .map(|(index, tc)| {
                ToolCall::new(
                    format!("ollama_{}", index),
                    tc.function.name,
                    ToolCall::flatten_arguments(&tc.function.arguments),
                )
            })
            .collect();

        Ok(Response {
            content: message.content,
            model: parsed.model,
            input_tokens: parsed.prompt_eval_count.unwrap_or(0),
            output_tokens: parsed.eval_count.unwrap_or(0),
            stop_reason: parsed.done_reason.unwrap_or_default(),
            tool_calls,
        })
    }
}

/// True when something in the source chain is a refused TCP connection.
/// DNS and TLS failures also count as connect errors in reqwest.
fn is_connection_refused(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(error);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = err.source();
    }
    false
}

#[async_trait]
impl Provider for OllamaClient {
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
            .post(http::endpoint(&self.base_url, "/api/chat"))
            .json(&body);

        let reply = match http::send_json(ctx, builder).await {
            Ok(reply) => reply,
            Err(SendFailure::Interrupted(reason)) => {
                return Err(http::interrupted_error(self.name(), reason))
            }
            Err(SendFailure::Transport(e)) => return Err(self.transport_error(e)),
        };
        http::trace_body(self.name(), "Response", &reply.body);

        if !reply.status.is_success() {
            return Err(Self::status_error(&reply));
        }
        Self::to_response(&reply)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
