//! Integration tests for streaming responses

use crate::mock_server::MockServerFixture;
use claude_messages::pipeline::DecoderState;
use claude_messages::types::ContentDelta;
use claude_messages::{Error, Message, MessageRequest, StopReason, StreamEvent};
use futures::StreamExt;
use serde_json::json;

const START: &str = r#"{"type":"message_start","message":{"id":"msg_stream_1","type":"message","role":"assistant","content":[],"model":"claude-sonnet-4-20250514","stop_reason":null,"stop_sequence":null,"usage":{"input_tokens":25,"output_tokens":1}}}"#;

fn request() -> MessageRequest {
    MessageRequest::new(
        "claude-sonnet-4-20250514",
        512,
        vec![Message::user("Weather in Paris?")],
    )
}

#[tokio::test]
async fn test_sse_streaming_response() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_sse_stream(&[
            ("message_start", START),
            ("content_block_start", r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#),
            ("ping", r#"{"type":"ping"}"#),
            ("content_block_delta", r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#),
            ("content_block_delta", r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":" World"}}"#),
            ("content_block_stop", r#"{"type":"content_block_stop","index":0}"#),
            ("message_delta", r#"{"type":"message_delta","delta":{"stop_reason":"end_turn","stop_sequence":null},"usage":{"output_tokens":3}}"#),
            ("message_stop", r#"{"type":"message_stop"}"#),
        ])
        .await;

    let client = fixture.create_test_client().unwrap();
    let mut stream = client.stream_message(&request()).await.unwrap();

    let mut text = String::new();
    let mut count = 0;
    while let Some(event) = stream.next().await {
        let event = event.unwrap();
        count += 1;
        if let StreamEvent::ContentBlockDelta {
            delta: ContentDelta::TextDelta { text: fragment },
            ..
        } = &event
        {
            text.push_str(fragment);
        }
    }
    assert_eq!(count, 8);
    assert_eq!(text, "Hello World");
    assert_eq!(stream.state(), DecoderState::Closed);

    let snapshot = stream.snapshot().unwrap();
    assert_eq!(snapshot.text(), "Hello World");
    assert_eq!(snapshot.usage.output_tokens, 3);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_streamed_tool_call() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_sse_stream(&[
            ("message_start", START),
            ("content_block_start", r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#),
            ("content_block_delta", r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Let me check."}}"#),
            ("content_block_stop", r#"{"type":"content_block_stop","index":0}"#),
            ("content_block_start", r#"{"type":"content_block_start","index":1,"content_block":{"type":"tool_use","id":"toolu_01T1x1fJ34qAmk2tNTrN7Up6","name":"get_weather","input":{}}}"#),
            ("content_block_delta", r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":""}}"#),
            ("content_block_delta", r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"location\": \"Par"}}"#),
            ("content_block_delta", r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"is\", \"unit\": \"c\"}"}}"#),
            ("content_block_stop", r#"{"type":"content_block_stop","index":1}"#),
            ("message_delta", r#"{"type":"message_delta","delta":{"stop_reason":"tool_use","stop_sequence":null},"usage":{"output_tokens":89}}"#),
            ("message_stop", r#"{"type":"message_stop"}"#),
        ])
        .await;

    let message = fixture
        .create_test_client()
        .unwrap()
        .stream_message(&request())
        .await
        .unwrap()
        .final_message()
        .await
        .unwrap();

    assert_eq!(message.text(), "Let me check.");
    assert_eq!(message.stop_reason, Some(StopReason::ToolUse));
    let tools = message.tool_uses();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "get_weather");
    assert_eq!(tools[0].input, &json!({"location": "Paris", "unit": "c"}));
}

#[tokio::test]
async fn test_stream_with_crlf_and_comments() {
    let fixture = MockServerFixture::new().await;
    let body = [
        ": connected\r\n\r\n",
        "event: message_start\r\ndata: ",
        START,
        "\r\n\r\n",
        "event: content_block_start\r\ndata: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\r\n\r\n",
        "event: content_block_delta\r\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"ok\"}}\r\n\r\n",
        "event: content_block_stop\r\ndata: {\"type\":\"content_block_stop\",\"index\":0}\r\n\r\n",
        "event: message_stop\r\ndata: {\"type\":\"message_stop\"}\r\n\r\n",
    ]
    .concat();
    let _mock = fixture.mock_raw_sse(&body).await;

    let message = fixture
        .create_test_client()
        .unwrap()
        .stream_message(&request())
        .await
        .unwrap()
        .final_message()
        .await
        .unwrap();
    assert_eq!(message.text(), "ok");
}

#[tokio::test]
async fn test_truncated_stream_is_incomplete() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_sse_stream(&[
            ("message_start", START),
            ("content_block_start", r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#),
            ("content_block_delta", r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hel"}}"#),
        ])
        .await;

    let err = fixture
        .create_test_client()
        .unwrap()
        .stream_message(&request())
        .await
        .unwrap()
        .final_message()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Incomplete { .. }));
}

#[tokio::test]
async fn test_overloaded_error_event() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_sse_stream(&[
            ("message_start", START),
            ("error", r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#),
        ])
        .await;

    let err = fixture
        .create_test_client()
        .unwrap()
        .stream_message(&request())
        .await
        .unwrap()
        .final_message()
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(err, Error::Api { status: None, .. }));
}

#[tokio::test]
async fn test_http_error_before_stream_starts() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_error_response(
            401,
            r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
            None,
        )
        .await;

    let err = fixture
        .create_test_client()
        .unwrap()
        .stream_message(&request())
        .await
        .unwrap_err();
    match err {
        Error::Api {
            status, error_type, ..
        } => {
            assert_eq!(status, Some(401));
            assert_eq!(error_type, "authentication_error");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}
