//! Error types shared by the request pipeline and its callers.

use serde::Deserialize;
use thiserror::Error;

/// Shown when neither the server nor the transport gave a usable message.
pub const FALLBACK_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Message carried by [`ApiError::SessionEnded`].
pub const SESSION_ENDED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Normalized failure of a REST call.
///
/// Every variant carries a human-readable message that can be shown to the
/// user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No response was received (connection refused, DNS, timeout...).
    #[error("{0}")]
    Network(String),
    /// The server answered with a non-success status.
    #[error("{message}")]
    Http { status: u16, message: String },
    /// Credentials could not be refreshed; local session state was cleared.
    #[error("{0}")]
    SessionEnded(String),
    /// A success response could not be decoded.
    #[error("{0}")]
    Decode(String),
}

impl ApiError {
    /// Build an HTTP error from a status and the raw response body.
    ///
    /// Prefers the server's `message` field, then its `error` field, then the
    /// generic status line.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = extract_error_message(body)
            .unwrap_or_else(|| format!("Request failed with status code {status}"));
        ApiError::Http { status, message }
    }

    /// Build a transport error, falling back to the generic message when the
    /// transport gave nothing useful.
    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            ApiError::Network(FALLBACK_ERROR_MESSAGE.to_string())
        } else {
            ApiError::Network(message)
        }
    }

    pub fn session_ended() -> Self {
        ApiError::SessionEnded(SESSION_ENDED_MESSAGE.to_string())
    }

    /// The user-facing message.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Network(msg) | ApiError::SessionEnded(msg) | ApiError::Decode(msg) => msg,
            ApiError::Http { message, .. } => message,
        }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_session_ended(&self) -> bool {
        matches!(self, ApiError::SessionEnded(_))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Pull a user-facing message out of an error response body.
///
/// Looks at `message` first, then `error`. Either may be a string or a nested
/// object with its own `message`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok()?;
    [parsed.message, parsed.error]
        .into_iter()
        .flatten()
        .find_map(|value| text_of(&value))
}

fn text_of(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Object(map) => map.get("message").and_then(text_of),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_field_wins_over_error_field() {
        let body = r#"{"success":false,"message":"Issue not found","error":"NotFound"}"#;
        assert_eq!(extract_error_message(body).as_deref(), Some("Issue not found"));
    }

    #[test]
    fn error_field_used_when_message_missing_or_blank() {
        assert_eq!(
            extract_error_message(r#"{"error":"Forbidden"}"#).as_deref(),
            Some("Forbidden")
        );
        assert_eq!(
            extract_error_message(r#"{"message":"  ","error":{"message":"Nested"}}"#).as_deref(),
            Some("Nested")
        );
    }

    #[test]
    fn non_json_body_falls_back_to_status_line() {
        let err = ApiError::from_response(502, "<html>Bad gateway</html>");
        assert_eq!(err.message(), "Request failed with status code 502");
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn blank_transport_message_uses_fallback() {
        assert_eq!(ApiError::network("").message(), FALLBACK_ERROR_MESSAGE);
        assert!(ApiError::session_ended().is_session_ended());
    }
}
