//! Agent host API client.
//!
//! Opens conversation streams and wraps the small REST surface around them
//! (interrupt, cancel, feedback, and the dashboard status endpoints).

mod models;

pub use models::{ChatMessage, ConversationRequest, Feedback, InterruptRequest, Role};

use futures::Stream;
use serde::Serialize;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use urlencoding::encode;

use crate::adapters::ReqwestHttpClient;
use crate::error::{ClientError, StreamError};
use crate::sse::{event_stream, DomainEvent};
use crate::traits::{Headers, HttpClient};

/// Default agent host API root.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/host/v1";

/// Events of one open conversation, in arrival order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<DomainEvent, StreamError>> + Send>>;

/// Client for the agent host.
///
/// Cheap to clone; clones share the underlying transport.
pub struct HostClient<C: HttpClient = ReqwestHttpClient> {
    base_url: String,
    http: Arc<C>,
    timeout_secs: u64,
}

impl<C: HttpClient> Clone for HostClient<C> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            http: Arc::clone(&self.http),
            timeout_secs: self.timeout_secs,
        }
    }
}

impl HostClient<ReqwestHttpClient> {
    /// Client on the production transport.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(base_url, ReqwestHttpClient::new())
    }
}

impl<C: HttpClient> HostClient<C> {
    pub fn with_http(base_url: impl Into<String>, http: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Arc::new(http),
            timeout_secs: 300,
        }
    }

    /// Seconds reported in timeout errors.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn json_headers() -> Headers {
        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers
    }

    /// Start a turn and stream its events.
    ///
    /// Connection and status failures are returned before any event; see
    /// [`crate::sse::event_stream`] for what the stream itself yields.
    pub async fn open_conversation(
        &self,
        request: &ConversationRequest,
    ) -> Result<EventStream, StreamError> {
        let url = self.url("/conversations");
        let body = serde_json::to_string(request).map_err(ClientError::from)?;

        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "text/event-stream".to_string());

        tracing::info!(url = %url, messages = request.messages.len(), "Opening conversation");
        let body_stream = self
            .http
            .post_stream(&url, &body, &headers)
            .await
            .map_err(|e| ClientError::from_http(e, &url, self.timeout_secs))?;

        Ok(Box::pin(event_stream(body_stream)))
    }

    /// Ask the host to stop a running stream.
    pub async fn interrupt(
        &self,
        stream_id: &str,
        request: &InterruptRequest,
    ) -> Result<Value, ClientError> {
        self.post_json(&format!("/conversations/{}/interrupt", encode(stream_id)), request)
            .await
    }

    /// Delete a session on the host.
    pub async fn cancel(&self, session_id: &str) -> Result<Value, ClientError> {
        let url = self.url(&format!("/conversations/{}", encode(session_id)));
        let response = self
            .http
            .delete(&url, &Self::json_headers())
            .await
            .map_err(|e| ClientError::from_http(e, &url, self.timeout_secs))?;
        Self::decode(response)
    }

    pub async fn submit_feedback(
        &self,
        session_id: &str,
        feedback: &Feedback,
    ) -> Result<Value, ClientError> {
        self.post_json(&format!("/conversations/{}/feedback", encode(session_id)), feedback)
            .await
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        self.get_json("/health").await
    }

    pub async fn status(&self) -> Result<Value, ClientError> {
        self.get_json("/status").await
    }

    pub async fn hosts_status(&self) -> Result<Value, ClientError> {
        self.get_json("/hosts/status").await
    }

    pub async fn mcp_status(&self) -> Result<Value, ClientError> {
        self.get_json("/mcp/status").await
    }

    pub async fn mcp_tools(&self) -> Result<Value, ClientError> {
        self.get_json("/mcp/tools").await
    }

    pub async fn mcp_clients(&self) -> Result<Value, ClientError> {
        self.get_json("/mcp/clients").await
    }

    async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url, &Self::json_headers())
            .await
            .map_err(|e| ClientError::from_http(e, &url, self.timeout_secs))?;
        Self::decode(response)
    }

    async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Value, ClientError> {
        let url = self.url(path);
        let body = serde_json::to_string(body)?;
        let response = self
            .http
            .post(&url, &body, &Self::json_headers())
            .await
            .map_err(|e| ClientError::from_http(e, &url, self.timeout_secs))?;
        Self::decode(response)
    }

    fn decode(response: crate::traits::Response) -> Result<Value, ClientError> {
        if !response.is_success() {
            return Err(ClientError::Http {
                status: response.status,
                message: crate::error::extract_error_message(&response.text(), response.status),
            });
        }
        if response.body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(response.json()?)
    }
}
