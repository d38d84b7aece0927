//! Mock HTTP server setup for integration tests

use claude_messages::{MessagesClient, MessagesClientBuilder};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const TEST_API_KEY: &str = "sk-ant-test";
pub const MESSAGES_PATH: &str = "/v1/messages";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Create a test client with the mock server as base URL
    pub fn create_test_client(&self) -> claude_messages::Result<MessagesClient> {
        self.builder().build()
    }

    pub fn builder(&self) -> MessagesClientBuilder {
        MessagesClientBuilder::new()
            .api_key(TEST_API_KEY)
            .base_url(&self.base_url)
    }

    /// Create a mock for a successful streaming response (SSE).
    ///
    /// Each `(event, data)` pair becomes one `event:`/`data:` frame.
    pub async fn mock_sse_stream(&self, frames: &[(&str, &str)]) -> Mock {
        let body = frames
            .iter()
            .map(|(event, data)| format!("event: {}\ndata: {}\n\n", event, data))
            .collect::<Vec<_>>()
            .join("");
        self.mock_raw_sse(&body).await
    }

    /// Create a mock whose SSE body is sent verbatim.
    pub async fn mock_raw_sse(&self, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", MESSAGES_PATH)
            .match_header("x-api-key", TEST_API_KEY)
            .match_header("accept", "text/event-stream")
            .match_body(Matcher::PartialJson(serde_json::json!({"stream": true})))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock for a successful JSON response
    pub async fn mock_json_response(&self, status: u16, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", MESSAGES_PATH)
            .match_header("x-api-key", TEST_API_KEY)
            .match_header("anthropic-version", "2023-06-01")
            .match_header("content-type", "application/json")
            .with_status(status as usize)
            .with_header("content-type", "application/json")
            .with_header("request-id", "req_test_1")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock for an error response
    pub async fn mock_error_response(
        &self,
        status: u16,
        error_body: &str,
        retry_after: Option<&str>,
    ) -> Mock {
        let mut server = self.server.lock().await;
        let mut mock = server
            .mock("POST", MESSAGES_PATH)
            .with_status(status as usize)
            .with_header("content-type", "application/json")
            .with_body(error_body);
        if let Some(value) = retry_after {
            mock = mock.with_header("retry-after", value);
        }
        mock.create_async().await
    }
}

pub fn message_json(text: &str) -> String {
    serde_json::json!({
        "id": "msg_013Zva2CMHLNnXjNJJKqJ2EF",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "model": "claude-sonnet-4-20250514",
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {"input_tokens": 12, "output_tokens": 6}
    })
    .to_string()
}
