//! Streaming-related error types.
//!
//! Errors that occur while consuming a conversation's SSE stream. Per-frame
//! errors are logged and skipped; per-connection errors end the turn.

use crate::error::ClientError;

/// Stream-specific error variants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StreamError {
    /// The backend could not be reached at all.
    #[error("Connection to {url} failed: {message}")]
    ConnectionFailure { url: String, message: String },

    /// The backend answered with a non-2xx status.
    #[error("Backend returned HTTP {status}: {message}")]
    HttpFailure { status: u16, message: String },

    /// The turn deadline passed before a terminal event arrived.
    #[error("Stream timeout after {duration_secs} seconds")]
    Timeout { duration_secs: u64 },

    /// The connection broke mid-stream.
    #[error("Stream connection lost: {message}")]
    ConnectionLost { message: String },

    /// One frame's payload could not be decoded. Never fatal.
    #[error("Invalid JSON for {} event: {cause}", .event_type.as_deref().unwrap_or("anonymous"))]
    MalformedFrame {
        event_type: Option<String>,
        raw: String,
        cause: String,
    },

    /// The body ended without final, error, timeout or interrupt.
    #[error("Stream ended without a terminal event")]
    NoTerminalEvent,
}

impl StreamError {
    /// Whether this error ends the turn. Only malformed frames are skipped.
    pub fn terminates_session(&self) -> bool {
        !matches!(self, StreamError::MalformedFrame { .. })
    }

    /// Check if this error is likely transient and can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::ConnectionFailure { .. }
            | StreamError::ConnectionLost { .. }
            | StreamError::Timeout { .. }
            | StreamError::NoTerminalEvent => true,
            StreamError::HttpFailure { status, .. } => *status >= 500 || *status == 429,
            StreamError::MalformedFrame { .. } => false,
        }
    }

    /// Whether the session should end as timed out rather than failed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StreamError::Timeout { .. })
    }

    /// Get a user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::ConnectionFailure { .. } => {
                "Backend server not running. Please start the agent host and try again."
                    .to_string()
            }
            StreamError::HttpFailure { message, .. } => format!("Backend error: {}", message),
            StreamError::Timeout { .. } => {
                "Request timed out. The backend took too long to respond.".to_string()
            }
            StreamError::ConnectionLost { .. } => {
                "Connection to the backend was lost before the answer arrived. Please try again."
                    .to_string()
            }
            StreamError::MalformedFrame { .. } => {
                "Received invalid data from the backend.".to_string()
            }
            StreamError::NoTerminalEvent => {
                "No terminal event received; the response may be incomplete.".to_string()
            }
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::ConnectionFailure { .. } => "E_STREAM_CONN",
            StreamError::HttpFailure { .. } => "E_STREAM_HTTP",
            StreamError::Timeout { .. } => "E_STREAM_TIMEOUT",
            StreamError::ConnectionLost { .. } => "E_STREAM_LOST",
            StreamError::MalformedFrame { .. } => "E_STREAM_JSON",
            StreamError::NoTerminalEvent => "E_STREAM_UNTERMINATED",
        }
    }
}

impl From<ClientError> for StreamError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Connection { url, message } => {
                StreamError::ConnectionFailure { url, message }
            }
            ClientError::Http { status, message } => StreamError::HttpFailure { status, message },
            ClientError::Timeout { duration_secs } => StreamError::Timeout { duration_secs },
            other => StreamError::ConnectionLost {
                message: other.to_string(),
            },
        }
    }
}
