//! HTTP-level tests for the OpenAI-style providers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use text2sql::agent::steps::Gateway;
use text2sql::error::Text2SqlError;
use text2sql::provider::groq::GroqProvider;
use text2sql::provider::openai::OpenAiProvider;
use text2sql::provider::openai_compatible::OpenAiCompatibleProvider;
use text2sql::provider::{ModelProvider, ProviderRequest, ToolDefinition};
use text2sql::types::{FinishReason, GenerationSettings, ModelMessage};
use text2sql::util::retry::RetryPolicy;

fn test_retry_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(1),
        multiplier: 1.0,
    }
}

fn text_completion(text: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 30, "completion_tokens": 7, "total_tokens": 37}
    })
}

#[tokio::test]
async fn openai_parses_tool_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("\"sql_db_schema\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "sql_db_schema",
                            "arguments": "{\"table_names\":\"classes, students\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 50, "completion_tokens": 12, "total_tokens": 62}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("gpt-4o-mini", "test-key", Some(server.uri()));
    let request = ProviderRequest {
        messages: vec![ModelMessage::user("List all students in Grade 9A")],
        tools: Some(vec![ToolDefinition {
            name: "sql_db_schema".into(),
            description: "schema".into(),
            parameters: json!({"type": "object"}),
        }]),
        ..Default::default()
    };

    let response = provider.generate_text(&request).await.unwrap();

    assert_eq!(response.text, "");
    assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
    assert_eq!(response.usage.total_tokens, 62);
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].id, "call_abc");
    assert_eq!(
        response.tool_calls[0].arguments,
        json!({"table_names": "classes, students"})
    );
}

#[tokio::test]
async fn groq_unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid API Key", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let provider = GroqProvider::new("llama3-70b-8192", "bad-key", Some(server.uri()));
    assert_eq!(provider.provider_name(), "groq");

    let err = provider
        .generate_text(&ProviderRequest {
            messages: vec![ModelMessage::user("hi")],
            ..Default::default()
        })
        .await
        .unwrap_err();

    match err {
        Text2SqlError::Authentication(message) => assert_eq!(message, "Invalid API Key"),
        other => panic!("expected authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn gateway_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("You are a SQL expert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_completion("Answer: 3")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GroqProvider::new("llama3-70b-8192", "test-key", Some(server.uri()));
    let gateway = Gateway::new(
        Arc::new(provider),
        GenerationSettings::default(),
        test_retry_policy(2),
    );

    let response = gateway
        .complete(
            "You are a SQL expert",
            &[ModelMessage::user("How many students?")],
            None,
        )
        .await
        .unwrap();
    assert_eq!(response.text, "Answer: 3");
    assert_eq!(response.finish_reason, Some(FinishReason::Stop));
}

#[tokio::test]
async fn gateway_does_not_retry_client_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "context length exceeded"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new("gpt-4o", "test-key", Some(server.uri()));
    let gateway = Gateway::new(
        Arc::new(provider),
        GenerationSettings::default(),
        test_retry_policy(3),
    );

    let err = gateway.complete("system", &[], None).await.unwrap_err();
    assert!(matches!(err, Text2SqlError::Api { status: 400, .. }));
}

#[tokio::test]
async fn compatible_provider_sends_no_auth_without_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("\"model\":\"qwen2.5\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_completion("hello")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiCompatibleProvider::new("qwen2.5", None, server.uri());
    let response = provider
        .generate_text(&ProviderRequest {
            messages: vec![ModelMessage::user("hi")],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(response.text, "hello");

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("authorization").is_none());
}
