//! Integration tests for non-streaming calls and HTTP error mapping

use crate::mock_server::{message_json, MockServerFixture, MESSAGES_PATH};
use claude_messages::types::{ContentBlock, ImageMediaType, ImageSource, ToolChoice};
use claude_messages::types::{JsonSchema, ToolDefinition};
use claude_messages::{Error, ErrorCategory, Message, MessageRequest, StopReason};
use mockito::Matcher;
use serde_json::json;

fn request() -> MessageRequest {
    MessageRequest::new(
        "claude-sonnet-4-20250514",
        256,
        vec![Message::user("Say hello")],
    )
}

#[tokio::test]
async fn test_create_message_round_trip() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture.mock_json_response(200, &message_json("Hello!")).await;

    let client = fixture.create_test_client().unwrap();
    let message = client.create_message(&request()).await.unwrap();

    assert_eq!(message.text(), "Hello!");
    assert_eq!(message.stop_reason, Some(StopReason::EndTurn));
    assert_eq!(message.usage.input_tokens, 12);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_request_body_shape() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", MESSAGES_PATH)
            .match_header("anthropic-beta", "token-efficient-tools-2025-02-19,interleaved-thinking-2025-05-14")
            .match_header("x-client-request-id", Matcher::Regex("^[0-9a-f-]{36}$".into()))
            .match_body(Matcher::Json(json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 256,
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "image", "source": {"type": "base64", "media_type": "image/png", "data": "iVBORw0KGgo="}},
                        {"type": "text", "text": "What is this?"}
                    ]
                }],
                "tools": [{
                    "name": "describe",
                    "input_schema": {"type": "object", "properties": {"label": {"type": "string"}}, "required": ["label"]}
                }],
                "tool_choice": {"type": "any"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(message_json("A PNG."))
            .create_async()
            .await
    };

    let client = fixture
        .builder()
        .beta("token-efficient-tools-2025-02-19")
        .beta("interleaved-thinking-2025-05-14")
        .build()
        .unwrap();

    let image = ImageSource::base64(ImageMediaType::Png, "iVBORw0KGgo=").unwrap();
    let tool = ToolDefinition::new("describe")
        .unwrap()
        .input_schema(JsonSchema::object().property("label", JsonSchema::string(), true));
    let req = MessageRequest::new(
        "claude-sonnet-4-20250514",
        256,
        vec![Message::user(vec![
            ContentBlock::image(image),
            ContentBlock::text("What is this?"),
        ])],
    )
    .tools(vec![tool])
    .tool_choice(ToolChoice::any())
    // create_message never sends the stream flag
    .stream(true);

    let message = client.create_message(&req).await.unwrap();
    assert_eq!(message.text(), "A PNG.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_invalid_request_is_not_retryable() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_error_response(
            400,
            r#"{"type":"error","error":{"type":"invalid_request_error","message":"max_tokens: must be positive"}}"#,
            None,
        )
        .await;

    let err = fixture
        .create_test_client()
        .unwrap()
        .create_message(&request())
        .await
        .unwrap_err();

    match &err {
        Error::Api {
            status,
            error_type,
            message,
            ..
        } => {
            assert_eq!(*status, Some(400));
            assert_eq!(error_type, "invalid_request_error");
            assert_eq!(message, "max_tokens: must be positive");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(!err.is_retryable());
    assert_eq!(err.category(), ErrorCategory::Service);
}

#[tokio::test]
async fn test_overloaded_and_rate_limited_are_retryable() {
    for (status, error_type) in [(529u16, "overloaded_error"), (429, "rate_limit_error")] {
        let fixture = MockServerFixture::new().await;
        let body = json!({"type": "error", "error": {"type": error_type, "message": "try later"}});
        let _mock = fixture
            .mock_error_response(status, &body.to_string(), Some("3"))
            .await;

        let err = fixture
            .create_test_client()
            .unwrap()
            .create_message(&request())
            .await
            .unwrap_err();

        assert!(err.is_retryable(), "{status} should be retryable");
        match err {
            Error::Api {
                status: s,
                retry_after_ms,
                error_type: t,
                ..
            } => {
                assert_eq!(s, Some(status));
                assert_eq!(t, error_type);
                assert_eq!(retry_after_ms, Some(3000));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_non_json_error_body_falls_back_to_status() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_error_response(503, "upstream connect error", None)
        .await;

    let err = fixture
        .create_test_client()
        .unwrap()
        .create_message(&request())
        .await
        .unwrap_err();
    match err {
        Error::Api {
            error_type,
            message,
            retryable,
            ..
        } => {
            assert_eq!(error_type, "api_error");
            assert_eq!(message, "upstream connect error");
            assert!(retryable);
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreadable_error_body_falls_back_to_status() {
    let fixture = MockServerFixture::new().await;
    let _mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", MESSAGES_PATH)
            .with_status(503)
            .with_chunked_body(|_| {
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "upstream reset",
                ))
            })
            .create_async()
            .await
    };

    let err = fixture
        .create_test_client()
        .unwrap()
        .create_message(&request())
        .await
        .unwrap_err();
    match err {
        Error::Api {
            status,
            error_type,
            message,
            retryable,
            ..
        } => {
            assert_eq!(status, Some(503));
            assert_eq!(error_type, "api_error");
            assert_eq!(message, "HTTP 503");
            assert!(retryable);
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_success_body_is_decode_error() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_json_response(200, r#"{"id": "msg_1", "content": "#)
        .await;

    let err = fixture
        .create_test_client()
        .unwrap()
        .create_message(&request())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(err.category(), ErrorCategory::InvalidResponse);
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Port 9 (discard) on localhost is not expected to accept connections.
    let client = claude_messages::MessagesClientBuilder::new()
        .api_key("sk-ant-test")
        .base_url("http://127.0.0.1:9")
        .build()
        .unwrap();
    let err = client.create_message(&request()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_retryable());
}
