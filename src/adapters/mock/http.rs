//! Scripted [`HttpClient`] for tests.
//!
//! Responses are keyed by URL (exact match first, then prefix) and every
//! request is recorded for later assertions.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// A request seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
}

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// A buffered reply (any status)
    Success(Response),
    /// Fail before any response
    Error(HttpError),
    /// A streamed body delivered in these chunks
    Stream(Vec<Bytes>),
    /// A streamed body that breaks off with `error` after `chunks`
    BrokenStream { chunks: Vec<Bytes>, error: HttpError },
    /// A streamed body that delivers `chunks` and then never ends
    HangingStream(Vec<Bytes>),
}

impl MockResponse {
    /// A 200 reply with a JSON body.
    pub fn json(body: serde_json::Value) -> Self {
        MockResponse::Success(Response::new(200, body.to_string()))
    }

    /// A stream whose chunks are the given SSE text pieces.
    pub fn sse<S: AsRef<str>>(chunks: &[S]) -> Self {
        MockResponse::Stream(to_bytes(chunks))
    }

    /// Like [`MockResponse::sse`], but the connection stays open afterwards.
    pub fn hanging_sse<S: AsRef<str>>(chunks: &[S]) -> Self {
        MockResponse::HangingStream(to_bytes(chunks))
    }
}

fn to_bytes<S: AsRef<str>>(chunks: &[S]) -> Vec<Bytes> {
    chunks
        .iter()
        .map(|c| Bytes::copy_from_slice(c.as_ref().as_bytes()))
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    responses: Arc<Mutex<HashMap<String, MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_response(&self, url: &str, response: MockResponse) {
        lock(&self.responses).insert(url.to_string(), response);
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    fn record(&self, method: &str, url: &str, headers: &Headers, body: Option<&str>) {
        lock(&self.requests).push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body: body.map(String::from),
        });
    }

    fn lookup(&self, url: &str) -> Result<MockResponse, HttpError> {
        let responses = lock(&self.responses);
        if let Some(response) = responses.get(url) {
            return Ok(response.clone());
        }
        // Longest prefix wins so specific routes shadow general ones
        responses
            .iter()
            .filter(|(pattern, _)| url.starts_with(pattern.as_str()))
            .max_by_key(|(pattern, _)| pattern.len())
            .map(|(_, response)| response.clone())
            .ok_or_else(|| HttpError::Other(format!("No mock response for URL: {}", url)))
    }

    fn buffered(&self, url: &str) -> Result<Response, HttpError> {
        match self.lookup(url)? {
            MockResponse::Success(response) => Ok(response),
            MockResponse::Error(err) => Err(err),
            MockResponse::Stream(_)
            | MockResponse::BrokenStream { .. }
            | MockResponse::HangingStream(_) => Err(HttpError::Other(
                "Stream response on non-stream request".to_string(),
            )),
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record("GET", url, headers, None);
        self.buffered(url)
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record("POST", url, headers, Some(body));
        self.buffered(url)
    }

    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record("DELETE", url, headers, None);
        self.buffered(url)
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        self.record("POST", url, headers, Some(body));
        match self.lookup(url)? {
            MockResponse::Stream(chunks) => {
                Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
            }
            MockResponse::BrokenStream { chunks, error } => {
                let items = chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(error)));
                Ok(Box::pin(futures::stream::iter(items)))
            }
            MockResponse::HangingStream(chunks) => {
                let items = futures::stream::iter(chunks.into_iter().map(Ok))
                    .chain(futures::stream::pending());
                Ok(Box::pin(items))
            }
            MockResponse::Success(response) if !response.is_success() => {
                Err(HttpError::ServerError {
                    status: response.status,
                    message: response.text(),
                })
            }
            MockResponse::Success(_) => Err(HttpError::Other(
                "Non-stream response on stream request".to_string(),
            )),
            MockResponse::Error(err) => Err(err),
        }
    }
}
