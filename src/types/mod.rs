//! 类型系统模块：定义 Messages API 的请求、响应与流式事件类型。
//!
//! # Types Module
//!
//! Strongly-typed representations of the Messages API wire format.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Conversation turn with role and content |
//! | [`ContentBlock`] | Tagged content unit (text, image, document, tool use/result, cache marker, thinking) |
//! | [`MessageRequest`] | Request body with sampling, tools, tool choice and thinking config |
//! | [`MessageResponse`] | Complete assistant message with stop reason and usage |
//! | [`StreamEvent`] | One server-sent event of a streaming response |
//! | [`ToolDefinition`] | Client tool with a JSON-schema input shape |
//!
//! ## Submodules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`schema`] | Tool definitions, JSON schema, cache control |
//! | [`media`] | Validated image and document sources |
//! | [`message`] | Messages and content blocks |
//! | [`request`] | Request parameters |
//! | [`response`] | Non-streaming response |
//! | [`events`] | Streaming events and deltas |
//!
//! ## Example
//!
//! ```rust
//! use claude_messages::types::{ContentBlock, Message, MessageRequest, ToolChoice};
//!
//! let request = MessageRequest::new(
//!     "claude-sonnet-4-20250514",
//!     1024,
//!     vec![
//!         Message::user("What's in this file?"),
//!         Message::assistant(vec![ContentBlock::text("Let me look.")]),
//!     ],
//! )
//! .temperature(0.2)
//! .tool_choice(ToolChoice::auto());
//!
//! let body = request.to_json().unwrap();
//! assert_eq!(body["messages"][0]["content"], "What's in this file?");
//! ```

pub mod events;
pub mod media;
pub mod message;
pub mod request;
pub mod response;
pub mod schema;

pub use events::{ApiErrorBody, ContentDelta, DeltaUsage, MessageDeltaBody, StreamEvent};
pub use media::{DocumentMediaType, DocumentSource, ImageMediaType, ImageSource};
pub use message::{Content, ContentBlock, Message, Role};
pub use request::{MessageRequest, SystemBlock, SystemPrompt, ThinkingConfig, ToolChoice};
pub use response::{MessageResponse, StopReason, ToolUse, Usage};
pub use schema::{CacheControl, JsonSchema, JsonType, ToolDefinition};
