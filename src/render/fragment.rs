//! Text for individual events

use serde::Serialize;
use std::time::Duration;

use crate::session::{normalize_tool_name, SessionState};
use crate::sse::DomainEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Status,
    Tool,
    Answer,
    Question,
    Pause,
    Error,
}

/// One displayable line or block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub text: String,
    /// When the backing event arrived, relative to turn start. `None` for
    /// outcomes with no backing event.
    pub offset: Option<Duration>,
}

impl Fragment {
    pub(crate) fn for_event(event: &DomainEvent, offset: Duration, with_sql: bool) -> Self {
        let (kind, text) = describe(event, with_sql);
        Self {
            kind,
            text,
            offset: Some(offset),
        }
    }

    /// The single error line for an outcome no event reported.
    pub(crate) fn forced_outcome(state: SessionState, message: &str) -> Self {
        let prefix = match state {
            SessionState::TimedOut => "Timed out",
            SessionState::Interrupted => "Interrupted",
            _ => "Error",
        };
        Self {
            kind: FragmentKind::Error,
            text: format!("{}: {}", prefix, message),
            offset: None,
        }
    }
}

fn or_else<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.is_empty() {
        fallback
    } else {
        text
    }
}

fn describe(event: &DomainEvent, with_sql: bool) -> (FragmentKind, String) {
    use FragmentKind::*;

    match event {
        DomainEvent::Connected(e) if e.session_id.is_empty() => (Status, "Connected".to_string()),
        DomainEvent::Connected(e) => (Status, format!("Connected (stream {})", e.session_id)),
        DomainEvent::Progress(e) => {
            let label = or_else(&e.phase, &e.step);
            let text = match (label.is_empty(), e.message.is_empty()) {
                (true, true) => "Working".to_string(),
                (true, false) => e.message.clone(),
                (false, true) => format!("[{}]", label),
                (false, false) => format!("[{}] {}", label, e.message),
            };
            (Status, text)
        }
        DomainEvent::ToolStart(e) => {
            let name = normalize_tool_name(&e.tool);
            if e.description.is_empty() {
                (Tool, format!("Running {}", name))
            } else {
                (Tool, format!("Running {}: {}", name, e.description))
            }
        }
        DomainEvent::ToolComplete(e) => {
            let name = normalize_tool_name(&e.tool);
            if e.success {
                (Tool, format!("Finished {}", name))
            } else {
                (Tool, format!("{} failed", name))
            }
        }
        DomainEvent::Milestone(e) if e.message.is_empty() => {
            (Status, format!("Milestone: {}", e.phase))
        }
        DomainEvent::Milestone(e) => (Status, format!("Milestone {}: {}", e.phase, e.message)),
        DomainEvent::Pipeline(e) => (Status, format!("Pipeline {}", e.stage.replace('_', " "))),
        DomainEvent::Final(e) => {
            let mut text = e.content.clone();
            if with_sql {
                if let Some(sql) = e.sql() {
                    text.push_str(&format!("\n\n```sql\n{}\n```", sql));
                }
                if let Some(rows) = e.row_count() {
                    text.push_str(&format!("\n\n{} rows", rows));
                }
            }
            (Answer, text)
        }
        DomainEvent::Error(e) => (Error, format!("Error: {}", or_else(&e.message, "unknown error"))),
        DomainEvent::CriticalError(e) if e.severity.is_empty() => {
            (Error, format!("Critical error: {}", e.message))
        }
        DomainEvent::CriticalError(e) => (
            Error,
            format!("Critical error ({}): {}", e.severity, e.message),
        ),
        DomainEvent::ExecutionPaused(e) => (
            Pause,
            format!("Paused: {}", or_else(&e.message, or_else(&e.reason, "awaiting input"))),
        ),
        DomainEvent::AgentQuestion(e) => {
            let mut text = format!("Question: {}", e.question);
            for (i, option) in e.options.iter().enumerate() {
                text.push_str(&format!("\n  {}. {}", i + 1, option));
            }
            (Question, text)
        }
        DomainEvent::Interrupted(e) => (
            Error,
            format!("Interrupted: {}", or_else(&e.message, "stopped by the backend")),
        ),
        DomainEvent::Timeout(e) => (
            Error,
            format!("Timed out: {}", or_else(&e.message, "the backend gave up")),
        ),
        DomainEvent::Heartbeat => (Status, "(heartbeat)".to_string()),
        DomainEvent::Unknown(e) => (
            Status,
            format!(
                "Unhandled event '{}'",
                e.name.as_deref().unwrap_or("<anonymous>")
            ),
        ),
    }
}
