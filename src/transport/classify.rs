//! Error classification logic
//!
//! Maps non-2xx HTTP responses and in-stream `error` events onto [`Error::Api`].

use reqwest::header::HeaderMap;

use crate::error::Error;
use crate::types::events::ErrorResponse;

/// Canonical error type for an HTTP status, used when the body carries none.
pub fn error_type_for_status(status: u16) -> &'static str {
    match status {
        400 => "invalid_request_error",
        401 => "authentication_error",
        403 => "permission_error",
        404 => "not_found_error",
        413 => "request_too_large",
        429 => "rate_limit_error",
        529 => "overloaded_error",
        500..=599 => "api_error",
        _ => "unknown_error",
    }
}

/// Whether a request that failed with `status` may succeed if repeated.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 409 | 429) || (500..=599).contains(&status)
}

/// Whether an error type reported by the service is transient.
pub fn is_retryable_error_type(error_type: &str) -> bool {
    matches!(
        error_type,
        "rate_limit_error" | "overloaded_error" | "api_error" | "timeout_error"
    )
}

/// `retry-after` in milliseconds. Only the delta-seconds form is understood.
pub fn retry_after_ms(headers: &HeaderMap) -> Option<u32> {
    let value = headers.get(reqwest::header::RETRY_AFTER)?.to_str().ok()?;
    let secs: f64 = value.trim().parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).min(u32::MAX as f64) as u32)
}

/// Build the error for a non-2xx response.
///
/// The body's `error.type`/`error.message` win when present; otherwise the status decides the
/// type and the raw body (or the status text) becomes the message.
pub fn api_error(status: u16, headers: &HeaderMap, body: &[u8]) -> Error {
    let (error_type, message) = match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(parsed) => (parsed.error.error_type, parsed.error.message),
        Err(_) => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            let message = if text.is_empty() {
                format!("HTTP {}", status)
            } else {
                text
            };
            (error_type_for_status(status).to_string(), message)
        }
    };

    Error::Api {
        status: Some(status),
        retryable: is_retryable_status(status),
        retry_after_ms: retry_after_ms(headers),
        error_type,
        message,
    }
}
