//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::time::{Duration, Instant};

use hostchat::session::{StreamingSession, TurnId};
use hostchat::sse::{
    ConnectedEvent, DomainEvent, FinalEvent, ProgressEvent, ToolCompleteEvent, ToolStartEvent,
};

/// One SSE frame, blank-line terminated.
pub fn frame(event: &str, data: &str) -> String {
    format!("event: {}\ndata: {}\n\n", event, data)
}

/// connected, tool start, tool complete, final.
pub fn answer_frames() -> Vec<String> {
    vec![
        frame("connected", r#"{"sessionId":"abc"}"#),
        frame("tool_call_start", r#"{"tool":"oracle__run_sql"}"#),
        frame(
            "tool_call_complete",
            r#"{"tool":"oracle__run_sql","success":true}"#,
        ),
        frame("final", r#"{"content":"Answer: 42"}"#),
    ]
}

/// Typed events for replay tests.
pub fn answer_events() -> Vec<DomainEvent> {
    vec![
        DomainEvent::Connected(ConnectedEvent {
            session_id: "abc".to_string(),
        }),
        DomainEvent::Progress(ProgressEvent {
            phase: "planning".to_string(),
            ..Default::default()
        }),
        DomainEvent::ToolStart(ToolStartEvent {
            tool: "oracle__run_sql".to_string(),
            description: String::new(),
        }),
        DomainEvent::ToolComplete(ToolCompleteEvent {
            tool: "oracle__run_sql".to_string(),
            success: true,
        }),
        DomainEvent::Final(FinalEvent {
            content: "Answer: 42".to_string(),
            ..Default::default()
        }),
    ]
}

/// Feed `events` one second apart into a session started at `start`.
pub fn replay(events: &[DomainEvent], start: Instant) -> StreamingSession {
    let mut session = StreamingSession::started_at(TurnId::new(), start);
    for (i, event) in events.iter().enumerate() {
        session.ingest_at(event.clone(), start + Duration::from_secs(i as u64 + 1));
    }
    session
}
