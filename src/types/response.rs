//! Non-streaming Messages API response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, ErrorContext};
use crate::types::message::{ContentBlock, Role};

/// A complete assistant message, either decoded from a single response body or assembled
/// from a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    #[serde(rename = "type", default = "message_type")]
    pub object_type: String,
    pub role: Role,
    pub content: Vec<ContentBlock>,
    pub model: String,
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
    #[serde(default)]
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

fn message_type() -> String {
    "message".to_string()
}

impl MessageResponse {
    /// Decode a complete response body. Fails as a whole if any part does not match.
    pub fn from_slice(body: &[u8]) -> crate::Result<Self> {
        serde_json::from_slice(body).map_err(|e| decode_error(&e))
    }

    pub fn from_str(body: &str) -> crate::Result<Self> {
        Self::from_slice(body.as_bytes())
    }

    pub fn from_value(body: Value) -> crate::Result<Self> {
        serde_json::from_value(body).map_err(|e| decode_error(&e))
    }

    /// Concatenated text of all text blocks.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// Concatenated thinking of all thinking blocks, if any.
    pub fn thinking(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Thinking { thinking, .. } => Some(thinking.as_str()),
                _ => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(""))
        }
    }

    /// Tool invocations requested by the model, in order.
    pub fn tool_uses(&self) -> Vec<ToolUse<'_>> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => Some(ToolUse { id, name, input }),
                _ => None,
            })
            .collect()
    }
}

/// Borrowed view of a `tool_use` block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolUse<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub input: &'a Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
    PauseTurn,
    Refusal,
}

/// Token usage.
///
/// Field names match the wire format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,
}

fn decode_error(e: &serde_json::Error) -> Error {
    Error::decode(
        format!("response does not match the message schema: {}", e),
        ErrorContext::new()
            .with_details(format!("line {}, column {}", e.line(), e.column()))
            .with_source("response_decoder"),
    )
}
