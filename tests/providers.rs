//! Provider adapter tests against mock HTTP servers
//!
//! Each adapter is pointed at a wiremock server standing in for the vendor
//! endpoint, so these run without network access or API keys.

use std::collections::BTreeMap;
use std::time::Duration;

use delegate::core::{
    CallContext, ErrorCategory, Message, Request, Tool, ToolCall, ToolParam, ToolResult,
};
use delegate::llm::ollama::{OllamaClient, OllamaConfig};
use delegate::llm::provider::anthropic::{AnthropicConfig, AnthropicProvider};
use delegate::llm::provider::openai::{OpenAiConfig, OpenAiProvider};
use delegate::llm::Provider;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn anthropic(server: &MockServer) -> AnthropicProvider {
    AnthropicProvider::new(AnthropicConfig {
        api_key: "test-api-key".into(),
        base_url: server.uri(),
    })
    .unwrap()
}

fn openai(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::new(OpenAiConfig {
        api_key: "sk-test".into(),
        base_url: server.uri(),
    })
    .unwrap()
}

fn ollama(base_url: String) -> OllamaClient {
    OllamaClient::new(OllamaConfig { base_url }).unwrap()
}

fn hello(model: &str) -> Request {
    let mut request = Request::new(model);
    request.messages.push(Message::user("hello"));
    request
}

/// JSON body of the only request the server received
async fn sent_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    serde_json::from_slice(&requests[0].body).unwrap()
}

fn anthropic_text(text: &str) -> Value {
    json!({
        "id": "msg_test123",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "model": "claude-3-sonnet-20240229",
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 10, "output_tokens": 20}
    })
}

fn error_body(message: &str) -> Value {
    json!({"type": "error", "error": {"type": "some_error", "message": message}})
}

#[tokio::test]
async fn test_anthropic_headers_and_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-api-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_text("Hi there")))
        .expect(1)
        .mount(&server)
        .await;

    let mut request = hello("claude-3-sonnet-20240229");
    request.system = "Be brief.".into();
    let response = anthropic(&server)
        .send(&CallContext::new(), &request)
        .await
        .unwrap();

    assert_eq!(response.content, "Hi there");
    assert_eq!(response.input_tokens, 10);
    assert_eq!(response.output_tokens, 20);
    assert_eq!(response.stop_reason, "end_turn");

    let body = sent_body(&server).await;
    assert_eq!(body["max_tokens"], 4096);
    assert!(body.get("temperature").is_none());
    assert_eq!(body["system"], "Be brief.");
    assert_eq!(body["messages"][0]["content"], "hello");
}

#[tokio::test]
async fn test_anthropic_tool_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [
                {"type": "text", "text": "Delegating."},
                {"type": "tool_use", "id": "toolu_1", "name": "call_agent",
                 "input": {"agent": "helper", "task": "say hello"}}
            ],
            "model": "claude",
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 1, "output_tokens": 2}
        })))
        .mount(&server)
        .await;

    let mut request = hello("claude");
    request.temperature = 0.7;
    request.max_tokens = 512;
    request.tools.push(
        Tool::new("call_agent", "Delegate").param("agent", ToolParam::string("Agent", true)),
    );
    let provider = anthropic(&server);
    let response = provider.send(&CallContext::new(), &request).await.unwrap();

    assert_eq!(response.content, "Delegating.");
    assert_eq!(response.tool_calls.len(), 1);
    let call = &response.tool_calls[0];
    assert_eq!(call.id, "toolu_1");
    assert_eq!(call.get_string("task"), Some("say hello"));

    let body = sent_body(&server).await;
    assert_eq!(body["temperature"], 0.7);
    assert_eq!(body["max_tokens"], 512);
    assert_eq!(body["tools"][0]["input_schema"]["required"], json!(["agent"]));

    // The follow-up turn carries the result under the same id
    server.reset().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_text("Done")))
        .mount(&server)
        .await;
    request.messages.push(Message::assistant_with_tool_calls(
        response.content.clone(),
        response.tool_calls.clone(),
    ));
    request
        .messages
        .push(Message::tool_results(vec![ToolResult::success("toolu_1", "hello!")]));
    provider.send(&CallContext::new(), &request).await.unwrap();

    let body = sent_body(&server).await;
    let result = &body["messages"][2]["content"][0];
    assert_eq!(body["messages"][2]["role"], "user");
    assert_eq!(result["type"], "tool_result");
    assert_eq!(result["tool_use_id"], "toolu_1");
    assert_eq!(result["is_error"], false);
}

#[tokio::test]
async fn test_anthropic_status_categories() {
    let cases = [
        (401, ErrorCategory::Auth),
        (400, ErrorCategory::BadRequest),
        (429, ErrorCategory::RateLimit),
        (529, ErrorCategory::Overloaded),
        (500, ErrorCategory::Server),
        (418, ErrorCategory::Server),
    ];
    for (status, category) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_json(error_body("nope")))
            .mount(&server)
            .await;

        let err = anthropic(&server)
            .send(&CallContext::new(), &hello("claude"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), category, "status {}", status);
        assert_eq!(err.status(), status);
        assert_eq!(err.message(), "nope");
    }
}

#[tokio::test]
async fn test_openai_bearer_and_omissions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "call_agent",
                            "arguments": "{\"agent\":\"helper\",\"task\":\"say hello\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 3, "completion_tokens": 4}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut request = hello("gpt-4o");
    request.temperature = 0.7;
    let response = openai(&server)
        .send(&CallContext::new(), &request)
        .await
        .unwrap();

    assert_eq!(response.content, "");
    assert_eq!(response.stop_reason, "tool_calls");
    let mut expected = BTreeMap::new();
    expected.insert("agent".to_string(), "helper".to_string());
    expected.insert("task".to_string(), "say hello".to_string());
    assert_eq!(
        response.tool_calls,
        vec![ToolCall::new("call_abc", "call_agent", expected)]
    );

    let body = sent_body(&server).await;
    assert_eq!(body["temperature"], 0.7);
    assert!(body.get("max_tokens").is_none());
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_openai_status_categories() {
    let cases = [
        (401, ErrorCategory::Auth),
        (403, ErrorCategory::Auth),
        (400, ErrorCategory::BadRequest),
        (404, ErrorCategory::BadRequest),
        (429, ErrorCategory::RateLimit),
        (503, ErrorCategory::Server),
    ];
    for (status, category) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": {"message": "denied", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let err = openai(&server)
            .send(&CallContext::new(), &hello("gpt-4o"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), category, "status {}", status);
        assert_eq!(err.message(), "denied");
    }
}

#[tokio::test]
async fn test_ollama_chat_and_synthesized_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "call_agent", "arguments": {"agent": "a", "task": "one"}}},
                    {"function": {"name": "call_agent", "arguments": {"agent": "b", "task": "two"}}}
                ]
            },
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 5,
            "eval_count": 7
        })))
        .mount(&server)
        .await;

    let response = ollama(server.uri())
        .send(&CallContext::new(), &hello("llama3.2"))
        .await
        .unwrap();
    let ids: Vec<&str> = response.tool_calls.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["ollama_0", "ollama_1"]);
    assert_eq!(response.tool_calls[1].get_string("agent"), Some("b"));
    assert_eq!(response.input_tokens, 5);
    assert_eq!(response.output_tokens, 7);

    let body = sent_body(&server).await;
    assert_eq!(body["stream"], false);
    assert!(body.get("options").is_none());
}

#[tokio::test]
async fn test_ollama_status_categories() {
    for (status, category) in [
        (400, ErrorCategory::BadRequest),
        (404, ErrorCategory::BadRequest),
        (500, ErrorCategory::Server),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(json!({"error": "model \"x\" not found"})),
            )
            .mount(&server)
            .await;

        let err = ollama(server.uri())
            .send(&CallContext::new(), &hello("x"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), category);
        assert_eq!(err.message(), "model \"x\" not found");
    }
}

#[tokio::test]
async fn test_ollama_connection_refused() {
    // Grab a free port, then release it so nothing is listening
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = ollama(base_url.clone())
        .send(&CallContext::new(), &hello("llama3.2"))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Server);
    assert!(err.message().contains(&base_url));
    assert!(err.message().contains("is Ollama running?"));
}

#[tokio::test]
async fn test_deadline_is_timeout_category() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(anthropic_text("late"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let ctx = CallContext::new().with_timeout(Duration::from_millis(100));
    let err = anthropic(&server).send(&ctx, &hello("claude")).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Timeout);
}

#[tokio::test]
async fn test_cancelled_context_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = CallContext::new();
    ctx.cancel();
    let err = openai(&server).send(&ctx, &hello("gpt-4o")).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Timeout);
}
