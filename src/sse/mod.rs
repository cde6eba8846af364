//! Server-Sent Events from the agent host.
//!
//! Layered bottom-up:
//! - `frame` - lines to [`Frame`]s (`event:` / `data:` / blank-line dispatch)
//! - `interpreter` - frames to typed [`DomainEvent`]s
//! - `payloads` - per-event field extraction with defaults
//! - `stream` - a chunked response body to an async stream of events

mod events;
mod frame;
mod interpreter;
mod payloads;
mod stream;

pub use events::{
    AgentQuestionEvent, ConnectedEvent, CriticalErrorEvent, DomainEvent, ErrorEvent,
    ExecutionPausedEvent, FinalEvent, InterruptedEvent, MilestoneEvent, PipelineEvent,
    ProgressEvent, TimeoutEvent, ToolCompleteEvent, ToolStartEvent, UnknownEvent,
};
pub use frame::{parse_frames, parse_sse_line, Frame, FrameParser, Frames, SseLine};
pub use interpreter::{interpret, interpret_event, InterpretError};
pub use stream::{event_stream, LineBuffer};
