//! Error handling for hostchat.
//!
//! - [`ClientError`] - a single REST request to the agent host failed
//! - [`StreamError`] - a conversation stream failed, per frame or per connection
//! - [`InterpretError`](crate::sse::InterpretError) - one SSE frame could not be decoded
//!
//! Per-frame errors never abort a turn; per-connection errors always end it.
//! The binary and config-file loading use `color_eyre::Result` at the edges.

mod client;
mod stream;

pub use client::{extract_error_message, ClientError};
pub use stream::StreamError;
