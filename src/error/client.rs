//! Host client error types.
//!
//! Errors returned by the REST side of the agent host API.

use serde_json::Value;

use crate::traits::HttpError;

/// Errors from a single request to the agent host.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Backend unreachable
    #[error("Connection to {url} failed: {message}")]
    Connection { url: String, message: String },

    /// Non-2xx response
    #[error("Backend error ({status}): {message}")]
    Http { status: u16, message: String },

    /// Request deadline passed
    #[error("Request timed out after {duration_secs} seconds")]
    Timeout { duration_secs: u64 },

    /// Response body was not the JSON we expected
    #[error("Invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else the transport reported
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ClientError {
    /// Classify a transport error for a request to `url`.
    pub fn from_http(err: HttpError, url: &str, timeout_secs: u64) -> Self {
        match err {
            HttpError::ConnectionFailed(message) => ClientError::Connection {
                url: url.to_string(),
                message,
            },
            HttpError::Timeout(_) => ClientError::Timeout {
                duration_secs: timeout_secs,
            },
            HttpError::ServerError { status, message } => ClientError::Http {
                status,
                message: extract_error_message(&message, status),
            },
            other => ClientError::Transport(other.to_string()),
        }
    }
}

/// Pull a readable message out of an error response body.
///
/// The host reports failures as `{"error": "..."}` or
/// `{"error": {"message": "..."}}`; anything else falls back to the status.
pub fn extract_error_message(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let error = value.get("error").unwrap_or(&value);
        let message = error
            .as_str()
            .or_else(|| error.get("message").and_then(Value::as_str));
        if let Some(message) = message {
            return message.to_string();
        }
    }
    format!("HTTP {}", status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_string() {
        assert_eq!(
            extract_error_message(r#"{"error":"host not found"}"#, 404),
            "host not found"
        );
    }

    #[test]
    fn test_extract_error_object() {
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"bad messages","code":7}}"#, 400),
            "bad messages"
        );
    }

    #[test]
    fn test_extract_top_level_message() {
        assert_eq!(extract_error_message(r#"{"message":"nope"}"#, 500), "nope");
    }

    #[test]
    fn test_extract_falls_back_to_status() {
        assert_eq!(extract_error_message("<html>oops</html>", 502), "HTTP 502");
        assert_eq!(extract_error_message(r#"{"error":{}}"#, 500), "HTTP 500");
    }

    #[test]
    fn test_from_http_classification() {
        let err = ClientError::from_http(
            HttpError::ConnectionFailed("refused".to_string()),
            "http://localhost:8080/host/v1/health",
            300,
        );
        assert!(matches!(err, ClientError::Connection { ref url, .. } if url.ends_with("/health")));

        let err = ClientError::from_http(HttpError::Timeout("slow".to_string()), "u", 300);
        assert!(matches!(err, ClientError::Timeout { duration_secs: 300 }));

        let err = ClientError::from_http(
            HttpError::ServerError {
                status: 400,
                message: r#"{"error":"empty messages"}"#.to_string(),
            },
            "u",
            300,
        );
        assert_eq!(err.to_string(), "Backend error (400): empty messages");

        let err = ClientError::from_http(HttpError::Cancelled, "u", 300);
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
