//! Server-sent events of the streaming Messages API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, ErrorContext};
use crate::types::message::ContentBlock;
use crate::types::response::{MessageResponse, StopReason};

/// One decoded SSE payload, tagged by its `type` field.
///
/// Unknown event or delta types are rejected at decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        message: MessageResponse,
    },
    ContentBlockStart {
        index: usize,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: ContentDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: DeltaUsage,
    },
    MessageStop,
    Ping,
    Error {
        error: ApiErrorBody,
    },
}

impl StreamEvent {
    /// Decode one SSE `data` payload.
    pub fn parse(data: &str) -> crate::Result<Self> {
        serde_json::from_str(data).map_err(|e| {
            Error::decode(
                format!("malformed stream event: {}", e),
                ErrorContext::new()
                    .with_details(truncate(data, 200))
                    .with_source("stream_decoder"),
            )
        })
    }

    /// Wire name of the event, as carried in the SSE `event:` field.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::MessageStart { .. } => "message_start",
            StreamEvent::ContentBlockStart { .. } => "content_block_start",
            StreamEvent::ContentBlockDelta { .. } => "content_block_delta",
            StreamEvent::ContentBlockStop { .. } => "content_block_stop",
            StreamEvent::MessageDelta { .. } => "message_delta",
            StreamEvent::MessageStop => "message_stop",
            StreamEvent::Ping => "ping",
            StreamEvent::Error { .. } => "error",
        }
    }
}

/// Fragment carried by a `content_block_delta` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
    InputJsonDelta { partial_json: String },
    CitationsDelta { citation: Value },
}

impl ContentDelta {
    pub fn kind(&self) -> &'static str {
        match self {
            ContentDelta::TextDelta { .. } => "text_delta",
            ContentDelta::ThinkingDelta { .. } => "thinking_delta",
            ContentDelta::SignatureDelta { .. } => "signature_delta",
            ContentDelta::InputJsonDelta { .. } => "input_json_delta",
            ContentDelta::CitationsDelta { .. } => "citations_delta",
        }
    }
}

/// Top-level fields updated by `message_delta`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
    #[serde(default)]
    pub stop_sequence: Option<String>,
}

/// Usage counters in `message_delta`; every counter is optional and cumulative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,
}

/// Error payload, shared by in-stream `error` events and non-2xx response bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default)]
    pub message: String,
}

/// `{"type": "error", "error": {...}}` body of a failed HTTP call.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ApiErrorBody,
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
