//! Domain event types
//!
//! Every frame the agent host sends is interpreted into one [`DomainEvent`].
//! Payload structs carry fully defaulted fields, so downstream code never has
//! to guess whether a field was present on the wire.

use serde::Serialize;
use serde_json::{Map, Value};

/// Stream opened; carries the backend's id for this conversation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ConnectedEvent {
    /// Backend session id (`sessionId` or `streamId` on the wire)
    pub session_id: String,
}

/// Pipeline progress report.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProgressEvent {
    /// `details.phase`
    pub phase: String,
    pub step: String,
    pub message: String,
    /// The raw `details` object (currentStep, totalSteps, query, rowCount, ...)
    pub details: Map<String, Value>,
}

impl ProgressEvent {
    /// `details.currentStep`, when reported
    pub fn current_step(&self) -> Option<u64> {
        self.details.get("currentStep").and_then(Value::as_u64)
    }

    /// `details.totalSteps`, when reported
    pub fn total_steps(&self) -> Option<u64> {
        self.details.get("totalSteps").and_then(Value::as_u64)
    }
}

/// A tool invocation started.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ToolStartEvent {
    /// Raw tool name, e.g. `oracle__run_sql`
    pub tool: String,
    pub description: String,
}

/// A tool invocation finished.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ToolCompleteEvent {
    pub tool: String,
    pub success: bool,
}

/// A named pipeline milestone was reached or decided.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MilestoneEvent {
    pub phase: String,
    pub message: String,
}

/// `pipeline.*` lifecycle notification.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PipelineEvent {
    /// Suffix after `pipeline.`, e.g. `level_start`
    pub stage: String,
    pub payload: Map<String, Value>,
}

/// The answer for this turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FinalEvent {
    /// `content`, or `answer` from older backends
    pub content: String,
    /// Optional answer type (`type` on the wire)
    pub kind: String,
    /// Everything else the backend attached: sql, data, row_count, data_points, ...
    pub extra: Map<String, Value>,
}

impl FinalEvent {
    /// Generated SQL, when the answer came from a query
    pub fn sql(&self) -> Option<&str> {
        self.extra.get("sql").and_then(Value::as_str)
    }

    pub fn row_count(&self) -> Option<u64> {
        self.extra.get("row_count").and_then(Value::as_u64)
    }
}

/// Recoverable backend error; ends the turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ErrorEvent {
    pub message: String,
}

/// Execution was paused waiting on the user. Does not end the turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExecutionPausedEvent {
    pub reason: String,
    pub message: String,
}

/// The agent needs an answer before it can continue. Does not end the turn.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AgentQuestionEvent {
    pub question: String,
    pub options: Vec<String>,
}

/// The backend acknowledged an interrupt.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct InterruptedEvent {
    pub message: String,
}

/// The backend gave up waiting on its own pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TimeoutEvent {
    pub message: String,
}

/// Unrecoverable backend failure.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CriticalErrorEvent {
    pub message: String,
    pub severity: String,
}

/// A frame whose event name is not in the vocabulary.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct UnknownEvent {
    /// Event name as received, if the frame had one
    pub name: Option<String>,
    /// Raw payload text
    pub raw: String,
}

/// Typed events from the agent host stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Connected(ConnectedEvent),
    Progress(ProgressEvent),
    ToolStart(ToolStartEvent),
    ToolComplete(ToolCompleteEvent),
    Milestone(MilestoneEvent),
    Pipeline(PipelineEvent),
    Final(FinalEvent),
    Error(ErrorEvent),
    ExecutionPaused(ExecutionPausedEvent),
    AgentQuestion(AgentQuestionEvent),
    Interrupted(InterruptedEvent),
    Timeout(TimeoutEvent),
    CriticalError(CriticalErrorEvent),
    Heartbeat,
    Unknown(UnknownEvent),
}

impl DomainEvent {
    /// Returns the event type name as a string for logging and display.
    pub fn event_type_name(&self) -> &'static str {
        match self {
            DomainEvent::Connected(_) => "connected",
            DomainEvent::Progress(_) => "progress",
            DomainEvent::ToolStart(_) => "tool_start",
            DomainEvent::ToolComplete(_) => "tool_complete",
            DomainEvent::Milestone(_) => "milestone",
            DomainEvent::Pipeline(_) => "pipeline",
            DomainEvent::Final(_) => "final",
            DomainEvent::Error(_) => "error",
            DomainEvent::ExecutionPaused(_) => "execution_paused",
            DomainEvent::AgentQuestion(_) => "agent_question",
            DomainEvent::Interrupted(_) => "interrupted",
            DomainEvent::Timeout(_) => "timeout",
            DomainEvent::CriticalError(_) => "critical_error",
            DomainEvent::Heartbeat => "heartbeat",
            DomainEvent::Unknown(_) => "unknown",
        }
    }

    /// Whether this event ends the turn.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DomainEvent::Final(_)
                | DomainEvent::Error(_)
                | DomainEvent::CriticalError(_)
                | DomainEvent::Timeout(_)
                | DomainEvent::Interrupted(_)
        )
    }
}
