//! Transport layer: moves JSON request bodies to the service and bytes back.
//!
//! The client only talks to the [`Transport`] trait, so tests and callers with their own HTTP
//! stack can swap out [`HttpTransport`].

pub mod classify;
pub mod http;

pub use http::{HttpConfig, HttpTransport};

use crate::{BoxStream, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `path` and return the full body of a successful response.
    ///
    /// Non-2xx responses are reported as [`crate::Error::Api`].
    async fn post_json(&self, path: &str, body: &Value) -> Result<Bytes>;

    /// POST `body` to `path` asking for `text/event-stream`, and return the body as it arrives.
    async fn post_stream(&self, path: &str, body: &Value) -> Result<BoxStream<'static, Bytes>>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
