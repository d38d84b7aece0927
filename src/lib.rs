//! # claude-messages
//!
//! Anthropic Messages API 的 Rust 客户端核心：请求模型、流式 SSE 解码器与非流式响应模型。
//!
//! Client core for the Anthropic Messages API: a typed request model, a streaming decoder that
//! turns server-sent events into a complete message, and a non-streaming response model.
//!
//! ## Overview
//!
//! - **Typed requests**: [`MessageRequest`] with content blocks for text, images, documents,
//!   tool use and results, cache markers and extended thinking
//! - **Streaming-first**: [`MessageStream`] yields every event and assembles the final message
//!   in the same pass
//! - **Strict decoding**: unknown event, delta, block or stop-reason types are errors, never
//!   silently dropped
//! - **Pluggable transport**: the [`transport::Transport`] trait sits between the client and
//!   the network
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use claude_messages::{Message, MessageRequest, MessagesClient};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> claude_messages::Result<()> {
//!     let client = MessagesClient::from_env()?;
//!     let request = MessageRequest::new(
//!         "claude-sonnet-4-20250514",
//!         1024,
//!         vec![Message::user("Hello, Claude")],
//!     );
//!
//!     // Non-streaming
//!     let message = client.create_message(&request).await?;
//!     println!("{}", message.text());
//!
//!     // Streaming
//!     let mut text = client.stream_message(&request).await?.text_stream().boxed();
//!     while let Some(fragment) = text.next().await {
//!         print!("{}", fragment?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Requests, content blocks, responses and stream events |
//! | [`pipeline`] | SSE framing, event decoding and message accumulation |
//! | [`transport`] | `Transport` trait, reqwest implementation, HTTP error classification |
//! | [`client`] | `MessagesClient` and its builder |
//! | [`error`] | Error type and structured context |

pub mod client;
pub mod pipeline;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{MessagesClient, MessagesClientBuilder};
pub use pipeline::MessageStream;
pub use types::{
    events::StreamEvent,
    message::{ContentBlock, Message, Role},
    request::MessageRequest,
    response::{MessageResponse, StopReason, Usage},
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A specialized Result for pipeline operations
pub type PipeResult<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `PipeResult<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = PipeResult<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorCategory, ErrorContext};
