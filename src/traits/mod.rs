//! Trait seams for dependency injection.
//!
//! - [`HttpClient`] - GET, POST, DELETE and streaming POST against the agent host

pub mod http;

pub use http::{ByteStream, Headers, HttpClient, HttpError, Response};
