//! Payload schemas with defaults
//!
//! The agent host's field names drifted between releases (`content` vs
//! `answer`, `sessionId` vs `streamId`), and serde aliases reject payloads
//! that carry both spellings. Payloads are therefore read from a parsed
//! [`Value`] and every field falls back to a typed default here, in one place.

use serde_json::{Map, Value};

use crate::sse::events::{
    AgentQuestionEvent, ConnectedEvent, CriticalErrorEvent, ErrorEvent, ExecutionPausedEvent,
    FinalEvent, InterruptedEvent, MilestoneEvent, PipelineEvent, ProgressEvent, TimeoutEvent,
    ToolCompleteEvent, ToolStartEvent,
};

/// First present string field among `keys`, else empty.
pub(crate) fn str_field(v: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| v.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// Boolean field, else `default`.
pub(crate) fn bool_field(v: &Value, key: &str, default: bool) -> bool {
    v.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Object field, else an empty map.
pub(crate) fn object_field(v: &Value, key: &str) -> Map<String, Value> {
    v.get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Array of strings; non-string entries are rendered as JSON text.
pub(crate) fn string_list(v: &Value, key: &str) -> Vec<String> {
    v.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The payload as a map, dropping the listed keys.
fn remaining_fields(v: &Value, consumed: &[&str]) -> Map<String, Value> {
    v.as_object()
        .map(|object| {
            object
                .iter()
                .filter(|(key, _)| !consumed.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

impl ConnectedEvent {
    pub(crate) fn from_json(v: &Value) -> Self {
        // Some backends send the id as a bare JSON string
        if let Some(id) = v.as_str() {
            return Self {
                session_id: id.to_string(),
            };
        }
        Self {
            session_id: str_field(v, &["sessionId", "streamId", "session_id", "stream_id"]),
        }
    }
}

impl ProgressEvent {
    pub(crate) fn from_json(v: &Value) -> Self {
        let details = object_field(v, "details");
        let phase = details
            .get("phase")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            phase,
            step: str_field(v, &["step"]),
            message: str_field(v, &["message"]),
            details,
        }
    }
}

impl ToolStartEvent {
    pub(crate) fn from_json(v: &Value) -> Self {
        Self {
            tool: str_field(v, &["tool", "tool_name"]),
            description: str_field(v, &["description", "message"]),
        }
    }
}

impl ToolCompleteEvent {
    pub(crate) fn from_json(v: &Value) -> Self {
        Self {
            tool: str_field(v, &["tool", "tool_name"]),
            // Older hosts only sent tool_call_complete for finished calls
            success: bool_field(v, "success", true),
        }
    }
}

impl MilestoneEvent {
    /// `milestone_decision` payload
    pub(crate) fn from_decision_json(v: &Value) -> Self {
        Self {
            phase: str_field(v, &["target_milestone"]),
            message: str_field(v, &["description", "message"]),
        }
    }

    /// `milestone.<name>` payload; `suffix` is used when no name is given
    pub(crate) fn from_named_json(v: &Value, suffix: &str) -> Self {
        let mut phase = str_field(v, &["milestone_name"]);
        if phase.is_empty() {
            phase = suffix.to_string();
        }
        Self {
            phase,
            message: str_field(v, &["message"]),
        }
    }
}

impl PipelineEvent {
    pub(crate) fn from_json(v: &Value, stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            payload: remaining_fields(v, &[]),
        }
    }
}

impl FinalEvent {
    pub(crate) fn from_json(v: &Value) -> Self {
        // A bare string payload is the answer itself
        if let Some(content) = v.as_str() {
            return Self {
                content: content.to_string(),
                ..Default::default()
            };
        }
        Self {
            content: str_field(v, &["content", "answer"]),
            kind: str_field(v, &["type"]),
            extra: remaining_fields(v, &["content", "answer", "type"]),
        }
    }
}

impl ErrorEvent {
    pub(crate) fn from_json(v: &Value) -> Self {
        if let Some(message) = v.as_str() {
            return Self {
                message: message.to_string(),
            };
        }
        Self {
            message: str_field(v, &["message", "error"]),
        }
    }
}

impl CriticalErrorEvent {
    pub(crate) fn from_json(v: &Value) -> Self {
        Self {
            message: str_field(v, &["message", "error"]),
            severity: str_field(v, &["severity"]),
        }
    }
}

impl ExecutionPausedEvent {
    pub(crate) fn from_json(v: &Value) -> Self {
        Self {
            reason: str_field(v, &["reason"]),
            message: str_field(v, &["message"]),
        }
    }
}

impl AgentQuestionEvent {
    pub(crate) fn from_json(v: &Value) -> Self {
        Self {
            question: str_field(v, &["question"]),
            options: string_list(v, "options"),
        }
    }
}

impl InterruptedEvent {
    pub(crate) fn from_json(v: &Value) -> Self {
        Self {
            message: str_field(v, &["message", "reason"]),
        }
    }
}

impl TimeoutEvent {
    pub(crate) fn from_json(v: &Value) -> Self {
        Self {
            message: str_field(v, &["message"]),
        }
    }
}
