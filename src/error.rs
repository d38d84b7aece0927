use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g., "document.data", "content_block_delta.index")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected shape, offending index)
    pub details: Option<String>,
    /// Component that detected the error (e.g., "document_source", "stream_decoder")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse error category, intended to drive caller retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The caller's input was invalid; retrying the same input will fail again.
    InvalidInput,
    /// The response could not be understood (malformed, truncated, unexpected shape).
    InvalidResponse,
    /// The network or the remote service failed.
    Service,
}

/// Unified error type for the Messages client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {message}{}", format_context(.context))]
    InvalidInput {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Decode error: {message}{}", format_context(.context))]
    Decode {
        message: String,
        context: ErrorContext,
    },

    #[error("Stream ended before completion: {message}")]
    Incomplete { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("API error{}: {error_type}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Api {
        status: Option<u16>,
        error_type: String,
        message: String,
        retryable: bool,
        retry_after_ms: Option<u32>,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create an invalid-input (construction) error with structured context
    pub fn invalid_input(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::InvalidInput {
            message: msg.into(),
            context,
        }
    }

    /// Create a configuration error with structured context
    pub fn configuration(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a decode error with structured context
    pub fn decode(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Decode {
            message: msg.into(),
            context,
        }
    }

    pub fn incomplete(msg: impl Into<String>) -> Self {
        Error::Incomplete {
            message: msg.into(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::InvalidInput { context, .. }
            | Error::Configuration { context, .. }
            | Error::Decode { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidInput { .. } | Error::Configuration { .. } | Error::Serialization(_) => {
                ErrorCategory::InvalidInput
            }
            Error::Decode { .. } | Error::Incomplete { .. } => ErrorCategory::InvalidResponse,
            Error::Transport(_) | Error::Api { .. } => ErrorCategory::Service,
        }
    }

    /// Whether repeating the same call may succeed.
    ///
    /// Network failures and interrupted streams are retryable; API errors carry their own
    /// classification derived from the HTTP status or the in-stream error type.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Incomplete { .. } => true,
            Error::Api { retryable, .. } => *retryable,
            _ => false,
        }
    }
}
