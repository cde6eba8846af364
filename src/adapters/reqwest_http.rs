//! Reqwest-backed [`HttpClient`].

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{header::HeaderMap, Method, RequestBuilder};
use std::time::Duration;

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// Production transport over a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound only the connect phase. Streaming bodies are bounded by the
    /// turn deadline, since a long answer is not a hang.
    pub fn with_connect_timeout(timeout: Duration) -> Result<Self, HttpError> {
        reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map(Self::with_client)
            .map_err(classify)
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        headers: &Headers,
        body: Option<&str>,
    ) -> RequestBuilder {
        let mut builder = headers
            .iter()
            .fold(self.client.request(method, url), |b, (name, value)| {
                b.header(name.as_str(), value.as_str())
            });
        if let Some(body) = body {
            builder = builder.body(body.to_owned());
        }
        builder
    }

    async fn buffered(builder: RequestBuilder) -> Result<Response, HttpError> {
        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = header_pairs(response.headers());
        let body = response.bytes().await.map_err(classify)?;
        Ok(Response::with_headers(status, headers, body))
    }
}

/// Map a reqwest failure onto the transport error kinds callers branch on.
fn classify(err: reqwest::Error) -> HttpError {
    let message = err.to_string();
    if err.is_timeout() {
        HttpError::Timeout(message)
    } else if err.is_connect() {
        HttpError::ConnectionFailed(message)
    } else if err.is_builder() {
        HttpError::InvalidUrl(message)
    } else {
        HttpError::Other(message)
    }
}

/// A body read failing mid-stream is I/O unless it is a timeout.
fn classify_chunk(err: reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout(err.to_string())
    } else {
        HttpError::Io(err.to_string())
    }
}

/// Non-UTF-8 header values are skipped.
fn header_pairs(map: &HeaderMap) -> Headers {
    map.iter()
        .filter_map(|(name, value)| Some((name.to_string(), value.to_str().ok()?.to_string())))
        .collect()
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        Self::buffered(self.request(Method::GET, url, headers, None)).await
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        Self::buffered(self.request(Method::POST, url, headers, Some(body))).await
    }

    async fn delete(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        Self::buffered(self.request(Method::DELETE, url, headers, None)).await
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        let response = self
            .request(Method::POST, url, headers, Some(body))
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::ServerError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        tracing::debug!(url, status = status.as_u16(), "Stream opened");
        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(classify_chunk)),
        ))
    }
}
