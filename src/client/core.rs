use crate::client::builder::MessagesClientBuilder;
use crate::pipeline::MessageStream;
use crate::transport::Transport;
use crate::types::request::MessageRequest;
use crate::types::response::MessageResponse;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Path of the Messages endpoint, relative to the base URL.
pub const MESSAGES_PATH: &str = "v1/messages";

/// Messages API client.
///
/// Cheap to clone; clones share the underlying transport and its connection pool.
#[derive(Clone)]
pub struct MessagesClient {
    transport: Arc<dyn Transport>,
}

impl MessagesClient {
    pub fn builder() -> MessagesClientBuilder {
        MessagesClientBuilder::new()
    }

    /// Client configured from `ANTHROPIC_*` environment variables.
    pub fn from_env() -> Result<Self> {
        MessagesClientBuilder::from_env().build()
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Send a request and wait for the complete message.
    ///
    /// Any `stream` flag on the request is dropped.
    pub async fn create_message(&self, request: &MessageRequest) -> Result<MessageResponse> {
        let body = encode(request, false)?;
        let start = Instant::now();

        let bytes = self.transport.post_json(MESSAGES_PATH, &body).await?;
        let message = MessageResponse::from_slice(&bytes)?;

        info!(
            model = message.model.as_str(),
            message_id = message.id.as_str(),
            stop_reason = ?message.stop_reason,
            input_tokens = message.usage.input_tokens,
            output_tokens = message.usage.output_tokens,
            duration_ms = start.elapsed().as_millis(),
            "message created"
        );
        Ok(message)
    }

    /// Send a request with `stream: true` and return the event stream.
    ///
    /// HTTP-level failures surface here; failures after the response started surface as items
    /// of the returned stream.
    pub async fn stream_message(&self, request: &MessageRequest) -> Result<MessageStream> {
        let body = encode(request, true)?;
        let bytes = self.transport.post_stream(MESSAGES_PATH, &body).await?;
        Ok(MessageStream::from_bytes(bytes))
    }
}

impl std::fmt::Debug for MessagesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagesClient").finish_non_exhaustive()
    }
}

fn encode(request: &MessageRequest, stream: bool) -> Result<Value> {
    let mut body = request.to_json()?;
    if let Some(obj) = body.as_object_mut() {
        if stream {
            obj.insert("stream".to_string(), Value::Bool(true));
        } else {
            obj.remove("stream");
        }
    }
    Ok(body)
}
