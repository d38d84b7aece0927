use crate::client::core::MessagesClient;
use crate::error::{Error, ErrorContext};
use crate::transport::{HttpConfig, HttpTransport, Transport};
use crate::Result;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Builder for [`MessagesClient`].
///
/// Explicit setters win over values picked up by [`MessagesClientBuilder::from_env`].
#[derive(Default)]
pub struct MessagesClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    api_version: Option<String>,
    betas: Vec<String>,
    timeout: Option<Duration>,
    transport: Option<Arc<dyn Transport>>,
}

impl MessagesClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the environment:
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `ANTHROPIC_API_KEY` | API key |
    /// | `ANTHROPIC_BASE_URL` | Base URL |
    /// | `ANTHROPIC_VERSION` | `anthropic-version` header |
    /// | `ANTHROPIC_BETA` | Comma-separated beta flags |
    /// | `ANTHROPIC_HTTP_TIMEOUT_SECS` | Request timeout in seconds |
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("ANTHROPIC_API_KEY").ok(),
            base_url: env::var("ANTHROPIC_BASE_URL").ok(),
            api_version: env::var("ANTHROPIC_VERSION").ok(),
            betas: env::var("ANTHROPIC_BETA")
                .map(|v| split_betas(&v))
                .unwrap_or_default(),
            timeout: env::var("ANTHROPIC_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
            transport: None,
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the base URL (primarily for proxies and mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Enable one beta feature flag.
    pub fn beta(mut self, flag: impl Into<String>) -> Self {
        let flag = flag.into();
        if !self.betas.contains(&flag) {
            self.betas.push(flag);
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use a custom transport. Connection settings are then ignored.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<MessagesClient> {
        if let Some(transport) = self.transport {
            return Ok(MessagesClient::with_transport(transport));
        }

        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::configuration(
                    "API key is required (set ANTHROPIC_API_KEY or call api_key())",
                    ErrorContext::new()
                        .with_field_path("api_key")
                        .with_source("client_builder"),
                )
            })?;

        let base_url = parse_base_url(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;

        let timeout = self
            .timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        if timeout.is_zero() {
            return Err(Error::configuration(
                "timeout must be greater than zero",
                ErrorContext::new()
                    .with_field_path("timeout")
                    .with_source("client_builder"),
            ));
        }

        let transport = HttpTransport::new(HttpConfig {
            api_key,
            base_url,
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            betas: self.betas,
            timeout,
        })?;

        Ok(MessagesClient::with_transport(Arc::new(transport)))
    }
}

fn split_betas(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse and normalize so relative paths join under the base path.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|e| {
        Error::configuration(
            format!("invalid base URL: {}", e),
            ErrorContext::new()
                .with_field_path("base_url")
                .with_details(raw.to_string())
                .with_source("client_builder"),
        )
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::configuration(
            format!("unsupported base URL scheme {:?}", url.scheme()),
            ErrorContext::new()
                .with_field_path("base_url")
                .with_source("client_builder"),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
