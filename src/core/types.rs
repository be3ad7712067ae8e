//! Shared types used across Delegate modules
//!
//! The unified request/response vocabulary every provider adapter translates
//! to and from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Text content, may be empty
    #[serde(default)]
    pub content: String,
    /// Tool calls made by the assistant (assistant messages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool results (tool messages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create an assistant message that invoked tools
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Create a tool-result message carrying one result per call of the previous turn
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            tool_results: results,
            ..Self::new(Role::Tool, "")
        }
    }
}

/// JSON-schema type and description of a single tool parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParam {
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl ToolParam {
    /// A string parameter
    pub fn string(description: impl Into<String>, required: bool) -> Self {
        Self {
            param_type: "string".to_string(),
            description: description.into(),
            required,
        }
    }
}

/// Definition of a tool that can be offered to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// Parameters keyed by name, ordered for stable wire output
    pub parameters: BTreeMap<String, ToolParam>,
}

impl Tool {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Add a parameter
    pub fn param(mut self, name: impl Into<String>, param: ToolParam) -> Self {
        self.parameters.insert(name.into(), param);
        self
    }

    /// Names of the required parameters, in name order
    pub fn required_params(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .filter(|(_, p)| p.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// JSON-schema `properties` object for this tool's parameters
    pub fn schema_properties(&self) -> serde_json::Map<String, serde_json::Value> {
        self.parameters
            .iter()
            .map(|(name, p)| {
                (
                    name.clone(),
                    serde_json::json!({
                        "type": p.param_type,
                        "description": p.description,
                    }),
                )
            })
            .collect()
    }

    /// Complete JSON-schema object; `required` is emitted only when non-empty
    pub fn json_schema(&self) -> serde_json::Value {
        let mut schema = serde_json::json!({
            "type": "object",
            "properties": self.schema_properties(),
        });
        let required = self.required_params();
        if !required.is_empty() {
            schema["required"] = serde_json::json!(required);
        }
        schema
    }
}

/// A tool call made by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-issued or synthesized id, unique within one assistant message
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// Arguments flattened to strings
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Get a non-empty string argument by key
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments
            .get(key)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Arguments as a JSON object of strings
    pub fn arguments_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.arguments
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }

    /// Flatten a JSON object of arbitrary values into string arguments.
    ///
    /// Strings are taken verbatim, everything else is re-encoded as JSON.
    /// Non-object input yields no arguments.
    pub fn flatten_arguments(value: &serde_json::Value) -> BTreeMap<String, String> {
        let Some(object) = value.as_object() else {
            return BTreeMap::new();
        };
        object
            .iter()
            .map(|(k, v)| {
                let flat = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), flat)
            })
            .collect()
    }
}

/// Result of executing a tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the call this answers
    pub call_id: String,
    /// Output (or diagnostic) text
    pub content: String,
    /// Whether the tool failed
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Create a failed result
    pub fn error(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

/// A completion request in the unified model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub model: String,
    /// System prompt; adapters decide how to send it
    #[serde(default)]
    pub system: String,
    /// Conversation history, append-only within a call
    #[serde(default)]
    pub messages: Vec<Message>,
    /// 0 means unset
    #[serde(default)]
    pub temperature: f64,
    /// 0 means unset
    #[serde(default)]
    pub max_tokens: u32,
    /// Empty disables tool calling
    #[serde(default)]
    pub tools: Vec<Tool>,
}

impl Request {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// A completion response in the unified model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub content: String,
    /// Model name echoed by the provider
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub stop_reason: String,
    /// Empty when the model produced a plain answer
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}
