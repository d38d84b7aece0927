use crate::transport::{classify, Transport, TransportError};
use crate::{BoxStream, Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Connection settings for [`HttpTransport`].
#[derive(Clone)]
pub struct HttpConfig {
    pub api_key: String,
    /// Base URL; request paths are joined onto it.
    pub base_url: Url,
    /// Value of the `anthropic-version` header.
    pub api_version: String,
    /// Beta feature flags, sent comma-joined in `anthropic-beta`.
    pub betas: Vec<String>,
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("api_version", &self.api_version)
            .field("betas", &self.betas)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// reqwest-backed [`Transport`].
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.config
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Transport(TransportError::Other(format!("invalid path {path:?}: {e}"))))
    }

    async fn send(&self, path: &str, body: &Value, stream: bool) -> Result<reqwest::Response> {
        let url = self.endpoint(path)?;
        let client_request_id = uuid::Uuid::new_v4().to_string();
        let start = Instant::now();

        let mut req = self
            .client
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .header("x-client-request-id", &client_request_id)
            .json(body);

        if !self.config.betas.is_empty() {
            req = req.header("anthropic-beta", self.config.betas.join(","));
        }
        req = req.header(
            "accept",
            if stream {
                "text/event-stream"
            } else {
                "application/json"
            },
        );

        let resp = req.send().await.map_err(TransportError::Http)?;
        let status = resp.status().as_u16();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !resp.status().is_success() {
            let headers = resp.headers().clone();
            let body = match resp.bytes().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(
                        http_status = status,
                        client_request_id = client_request_id.as_str(),
                        error = %e,
                        "failed to read error response body"
                    );
                    Bytes::new()
                }
            };
            let err = classify::api_error(status, &headers, &body);
            info!(
                http_status = status,
                request_id = request_id.as_str(),
                client_request_id = client_request_id.as_str(),
                endpoint = path,
                duration_ms = start.elapsed().as_millis(),
                retryable = err.is_retryable(),
                "messages request failed"
            );
            return Err(err);
        }

        info!(
            http_status = status,
            request_id = request_id.as_str(),
            client_request_id = client_request_id.as_str(),
            endpoint = path,
            stream,
            duration_ms = start.elapsed().as_millis(),
            "messages request accepted"
        );
        Ok(resp)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, path: &str, body: &Value) -> Result<Bytes> {
        let resp = self.send(path, body, false).await?;
        Ok(resp.bytes().await.map_err(TransportError::Http)?)
    }

    async fn post_stream(&self, path: &str, body: &Value) -> Result<BoxStream<'static, Bytes>> {
        let resp = self.send(path, body, true).await?;
        let byte_stream = resp
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));
        Ok(Box::pin(byte_stream))
    }
}
