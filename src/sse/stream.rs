//! Byte stream to domain events.
//!
//! Adapts a chunked response body into an async stream of
//! [`DomainEvent`]s. Chunks are split into lines only once a full line is
//! buffered, so chunk boundaries inside a UTF-8 sequence or between `\r`
//! and `\n` are harmless. The body is never held in memory as a whole.

use futures::stream::{self, Stream};
use futures_util::StreamExt;

use crate::error::StreamError;
use crate::sse::events::DomainEvent;
use crate::sse::frame::FrameParser;
use crate::sse::interpreter::{interpret, InterpretError};
use crate::traits::{ByteStream, HttpError};

/// Splits arbitrary byte chunks into complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Take the next complete line, without its terminator.
    pub fn next_line(&mut self) -> Option<String> {
        let newline = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=newline).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Whatever is left once the body has ended.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

struct StreamState {
    body: ByteStream,
    lines: LineBuffer,
    parser: FrameParser,
    finished: bool,
}

impl StreamState {
    /// Feed one line; a completed frame is interpreted immediately.
    fn feed(&mut self, line: &str) -> Option<Result<DomainEvent, StreamError>> {
        let frame = self.parser.feed_line(line)?;
        tracing::debug!(
            event = frame.event_name.as_deref().unwrap_or("<anonymous>"),
            "SSE frame"
        );
        Some(interpret(&frame).map_err(|err| {
            let InterpretError::Malformed {
                event_name,
                raw,
                cause,
            } = err;
            StreamError::MalformedFrame {
                event_type: event_name,
                raw,
                cause,
            }
        }))
    }
}

fn transport_error(err: HttpError) -> StreamError {
    match err {
        HttpError::Timeout(message) => StreamError::ConnectionLost {
            message: format!("read timed out: {}", message),
        },
        other => StreamError::ConnectionLost {
            message: other.to_string(),
        },
    }
}

/// Turn a response body into domain events, in arrival order.
///
/// Malformed frames surface as non-fatal [`StreamError::MalformedFrame`]
/// items and reading continues. A transport failure yields one
/// [`StreamError::ConnectionLost`] and ends the stream. A partial frame
/// left at end of body is dropped.
pub fn event_stream(body: ByteStream) -> impl Stream<Item = Result<DomainEvent, StreamError>> {
    let state = StreamState {
        body,
        lines: LineBuffer::new(),
        parser: FrameParser::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.lines.next_line() {
                if let Some(item) = state.feed(&line) {
                    return Some((item, state));
                }
                continue;
            }

            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.lines.extend(&chunk),
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(transport_error(err)), state));
                }
                None => {
                    state.finished = true;
                    if let Some(rest) = state.lines.take_remainder() {
                        if let Some(item) = state.feed(&rest) {
                            return Some((item, state));
                        }
                    }
                    if state.parser.has_pending() {
                        tracing::debug!("Body ended inside a frame; dropping it");
                    }
                    return None;
                }
            }
        }
    })
}
