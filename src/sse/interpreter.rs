//! Frame interpretation
//!
//! Maps a [`Frame`] onto a [`DomainEvent`] through an exact-match table of
//! event names. Names outside the table become [`DomainEvent::Unknown`];
//! only an unparseable payload is reported as an error, and callers are
//! expected to log it and keep reading.

use serde_json::Value;

use crate::sse::events::{
    AgentQuestionEvent, ConnectedEvent, CriticalErrorEvent, DomainEvent, ErrorEvent,
    ExecutionPausedEvent, FinalEvent, InterruptedEvent, MilestoneEvent, PipelineEvent,
    ProgressEvent, TimeoutEvent, ToolCompleteEvent, ToolStartEvent, UnknownEvent,
};
use crate::sse::frame::Frame;

/// A frame that could not be turned into an event.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpretError {
    /// The data payload was not valid JSON
    #[error("Malformed payload for event '{name}': {cause}", name = .event_name.as_deref().unwrap_or("<anonymous>"))]
    Malformed {
        event_name: Option<String>,
        raw: String,
        cause: String,
    },
}

/// Interpret one frame.
pub fn interpret(frame: &Frame) -> Result<DomainEvent, InterpretError> {
    interpret_event(frame.event_name.as_deref(), &frame.data())
}

/// Interpret an event name and its joined data payload.
pub fn interpret_event(event_name: Option<&str>, data: &str) -> Result<DomainEvent, InterpretError> {
    // Keep-alives carry no meaningful payload; don't let a stray body fail them
    if matches!(event_name, Some("heartbeat") | Some("done")) {
        return Ok(DomainEvent::Heartbeat);
    }

    let value: Value = serde_json::from_str(data).map_err(|e| InterpretError::Malformed {
        event_name: event_name.map(String::from),
        raw: data.to_string(),
        cause: e.to_string(),
    })?;

    // Anonymous frames may name themselves in the payload instead
    let resolved = match event_name {
        Some(name) => Some(name.to_string()),
        None => value
            .get("type")
            .or_else(|| value.get("event"))
            .and_then(Value::as_str)
            .map(String::from),
    };

    let Some(name) = resolved else {
        return Ok(unknown(None, data));
    };

    Ok(dispatch(&name, &value).unwrap_or_else(|| unknown(Some(name.as_str()), data)))
}

fn dispatch(name: &str, v: &Value) -> Option<DomainEvent> {
    let event = match name {
        "connected" => DomainEvent::Connected(ConnectedEvent::from_json(v)),
        "progress" => DomainEvent::Progress(ProgressEvent::from_json(v)),
        "tool_call_start" | "tool_start" => DomainEvent::ToolStart(ToolStartEvent::from_json(v)),
        "tool_call_complete" | "tool_complete" => {
            DomainEvent::ToolComplete(ToolCompleteEvent::from_json(v))
        }
        "milestone_decision" => DomainEvent::Milestone(MilestoneEvent::from_decision_json(v)),
        "final" | "final_response" => DomainEvent::Final(FinalEvent::from_json(v)),
        "error" => DomainEvent::Error(ErrorEvent::from_json(v)),
        "critical_error" => DomainEvent::CriticalError(CriticalErrorEvent::from_json(v)),
        "execution_paused" => DomainEvent::ExecutionPaused(ExecutionPausedEvent::from_json(v)),
        "agent_question" => DomainEvent::AgentQuestion(AgentQuestionEvent::from_json(v)),
        "interrupt" | "interrupted" | "interrupt_acknowledged" => {
            DomainEvent::Interrupted(InterruptedEvent::from_json(v))
        }
        "timeout" => DomainEvent::Timeout(TimeoutEvent::from_json(v)),
        "heartbeat" | "done" => DomainEvent::Heartbeat,
        other => {
            if let Some(stage) = other.strip_prefix("pipeline.") {
                DomainEvent::Pipeline(PipelineEvent::from_json(v, stage))
            } else if let Some(suffix) = other.strip_prefix("milestone.") {
                DomainEvent::Milestone(MilestoneEvent::from_named_json(v, suffix))
            } else {
                return None;
            }
        }
    };
    Some(event)
}

fn unknown(name: Option<&str>, raw: &str) -> DomainEvent {
    tracing::debug!(event = name.unwrap_or("<anonymous>"), "Unrecognised SSE event");
    DomainEvent::Unknown(UnknownEvent {
        name: name.map(String::from),
        raw: raw.to_string(),
    })
}
