//! Streaming session state machine
//!
//! A [`StreamingSession`] is the authoritative record of one conversation
//! turn: every ingested event in order, the live phase and tool, and the
//! terminal outcome. States run `Idle -> Streaming -> {Completed, Failed,
//! TimedOut, Interrupted}`. The first terminal transition wins; anything
//! after it is kept in history and otherwise ignored.
//!
//! Nothing here reads a clock on its own behalf. Each mutating call has an
//! `_at(now)` form so replays and tests are deterministic; the plain forms
//! use `Instant::now()`.

mod registry;
mod tools;

pub use registry::SessionRegistry;
pub use tools::normalize_tool_name;

use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::StreamError;
use crate::sse::{AgentQuestionEvent, DomainEvent, ExecutionPausedEvent, FinalEvent};

/// Default inactivity window before a streaming session is timed out.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(600);

/// Caller-assigned identifier of one turn. Not the backend's session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TurnId(Uuid);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Streaming,
    Completed,
    Failed,
    TimedOut,
    Interrupted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Streaming)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Streaming => "streaming",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::TimedOut => "timed out",
            SessionState::Interrupted => "interrupted",
        }
    }
}

/// One ingested event and when it arrived, relative to session start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedEvent {
    pub offset: Duration,
    pub event: DomainEvent,
}

/// Progress counters reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepInfo {
    pub current: u64,
    pub total: u64,
}

impl StepInfo {
    /// Completed fraction in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.current.min(self.total) as f64) / (self.total as f64)
    }
}

#[derive(Debug, Clone)]
pub struct StreamingSession {
    turn_id: TurnId,
    state: SessionState,
    events: Vec<RecordedEvent>,
    started_at: Instant,
    last_activity: Instant,
    stale_after: Duration,

    stream_id: Option<String>,
    current_phase: Option<String>,
    current_tool: Option<String>,
    step_info: Option<StepInfo>,
    completed_tools: Vec<String>,
    pending_question: Option<AgentQuestionEvent>,
    pause: Option<ExecutionPausedEvent>,

    final_response: Option<String>,
    final_event: Option<FinalEvent>,
    error: Option<String>,
    /// Index into `events` of the event that ended the turn, if one did
    terminal_index: Option<usize>,
    terminated_offset: Option<Duration>,
    /// Length of `events` when the session became terminal
    terminated_len: Option<usize>,
}

impl StreamingSession {
    /// New idle session starting now.
    pub fn new(turn_id: TurnId) -> Self {
        Self::started_at(turn_id, Instant::now())
    }

    /// New idle session with an explicit start instant.
    pub fn started_at(turn_id: TurnId, start: Instant) -> Self {
        Self {
            turn_id,
            state: SessionState::Idle,
            events: Vec::new(),
            started_at: start,
            last_activity: start,
            stale_after: DEFAULT_STALE_AFTER,
            stream_id: None,
            current_phase: None,
            current_tool: None,
            step_info: None,
            completed_tools: Vec::new(),
            pending_question: None,
            pause: None,
            final_response: None,
            final_event: None,
            error: None,
            terminal_index: None,
            terminated_offset: None,
            terminated_len: None,
        }
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    // -- accessors --

    pub fn turn_id(&self) -> TurnId {
        self.turn_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True until the session reaches a terminal state.
    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn start_time(&self) -> Instant {
        self.started_at
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    pub fn stream_id(&self) -> Option<&str> {
        self.stream_id.as_deref()
    }

    pub fn current_phase(&self) -> Option<&str> {
        self.current_phase.as_deref()
    }

    pub fn current_tool(&self) -> Option<&str> {
        self.current_tool.as_deref()
    }

    pub fn step_info(&self) -> Option<StepInfo> {
        self.step_info
    }

    /// Display names of tools that completed successfully, first-seen order.
    pub fn completed_tools(&self) -> &[String] {
        &self.completed_tools
    }

    /// The latest unanswered question from the agent, if any.
    pub fn pending_question(&self) -> Option<&AgentQuestionEvent> {
        self.pending_question.as_ref()
    }

    pub fn pause(&self) -> Option<&ExecutionPausedEvent> {
        self.pause.as_ref()
    }

    pub fn final_response(&self) -> Option<&str> {
        self.final_response.as_deref()
    }

    /// The full `final` payload, including type and extras.
    pub fn final_event(&self) -> Option<&FinalEvent> {
        self.final_event.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn terminal_index(&self) -> Option<usize> {
        self.terminal_index
    }

    /// Offset from start at which the session became terminal.
    pub fn terminated_offset(&self) -> Option<Duration> {
        self.terminated_offset
    }

    /// How many events were recorded when the session became terminal.
    /// Anything past this arrived late.
    pub fn terminated_len(&self) -> Option<usize> {
        self.terminated_len
    }

    /// Instant at which the session became terminal.
    pub fn finished_at(&self) -> Option<Instant> {
        self.terminated_offset.map(|offset| self.started_at + offset)
    }

    /// Time since start, frozen once terminal.
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        self.terminated_offset
            .unwrap_or_else(|| now.saturating_duration_since(self.started_at))
    }

    // -- transitions --

    /// Mark the turn as started before any event arrives.
    pub fn begin(&mut self) {
        if self.state == SessionState::Idle {
            self.state = SessionState::Streaming;
        }
    }

    pub fn ingest(&mut self, event: DomainEvent) {
        self.ingest_at(event, Instant::now());
    }

    /// Record `event` and apply it. Always appended to history; has no
    /// other effect once the session is terminal.
    pub fn ingest_at(&mut self, event: DomainEvent, now: Instant) {
        let offset = now.saturating_duration_since(self.started_at);
        self.last_activity = self.last_activity.max(now);
        let index = self.events.len();
        self.events.push(RecordedEvent {
            offset,
            event: event.clone(),
        });

        if self.state.is_terminal() {
            tracing::debug!(
                turn = %self.turn_id,
                event = event.event_type_name(),
                "Ignoring event after terminal state"
            );
            return;
        }
        self.begin();
        self.apply(event, index, offset);
    }

    fn apply(&mut self, event: DomainEvent, index: usize, offset: Duration) {
        match event {
            DomainEvent::Connected(e) => {
                if !e.session_id.is_empty() {
                    self.stream_id = Some(e.session_id);
                }
            }
            DomainEvent::Progress(e) => {
                let phase = if e.phase.is_empty() { &e.step } else { &e.phase };
                if !phase.is_empty() {
                    self.current_phase = Some(phase.clone());
                }
                if let (Some(current), Some(total)) = (e.current_step(), e.total_steps()) {
                    self.step_info = Some(StepInfo { current, total });
                }
            }
            DomainEvent::Milestone(e) => {
                if !e.phase.is_empty() {
                    self.current_phase = Some(e.phase);
                }
            }
            DomainEvent::Pipeline(e) => {
                self.current_phase = Some(e.stage);
            }
            DomainEvent::ToolStart(e) => {
                self.current_tool = Some(normalize_tool_name(&e.tool));
            }
            DomainEvent::ToolComplete(e) => {
                let name = normalize_tool_name(&e.tool);
                if self.current_tool.as_deref() == Some(name.as_str()) {
                    self.current_tool = None;
                }
                if e.success && !name.is_empty() && !self.completed_tools.contains(&name) {
                    self.completed_tools.push(name);
                }
            }
            DomainEvent::AgentQuestion(e) => self.pending_question = Some(e),
            DomainEvent::ExecutionPaused(e) => self.pause = Some(e),
            DomainEvent::Heartbeat | DomainEvent::Unknown(_) => {}

            DomainEvent::Final(e) => {
                self.final_response = Some(e.content.clone());
                self.final_event = Some(e);
                self.terminate(SessionState::Completed, None, Some(index), offset);
            }
            DomainEvent::Error(e) => {
                let message = non_empty(e.message, "The backend reported an error");
                self.terminate(SessionState::Failed, Some(message), Some(index), offset);
            }
            DomainEvent::CriticalError(e) => {
                let message = non_empty(e.message, "The backend reported a critical error");
                self.terminate(SessionState::Failed, Some(message), Some(index), offset);
            }
            DomainEvent::Timeout(e) => {
                let message = non_empty(e.message, "The backend timed out");
                self.terminate(SessionState::TimedOut, Some(message), Some(index), offset);
            }
            DomainEvent::Interrupted(e) => {
                let message = non_empty(e.message, "Interrupted");
                self.terminate(SessionState::Interrupted, Some(message), Some(index), offset);
            }
        }
    }

    fn terminate(
        &mut self,
        state: SessionState,
        error: Option<String>,
        index: Option<usize>,
        offset: Duration,
    ) {
        debug_assert!(state.is_terminal());
        self.state = state;
        self.error = error;
        self.terminal_index = index;
        self.terminated_offset = Some(offset);
        self.terminated_len = Some(self.events.len());
        self.current_tool = None;
        tracing::info!(turn = %self.turn_id, state = state.label(), "Turn finished");
    }

    /// Force termination with no backing event. No-op when already terminal.
    fn force(&mut self, state: SessionState, message: String, now: Instant) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let offset = now.saturating_duration_since(self.started_at);
        self.terminate(state, Some(message), None, offset);
        true
    }

    pub fn check_staleness(&mut self) -> bool {
        self.check_staleness_at(Instant::now())
    }

    /// Time the session out if it has run past the stale window without a
    /// terminal event. Activity does not extend the window. Returns whether
    /// it transitioned.
    pub fn check_staleness_at(&mut self, now: Instant) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        if elapsed <= self.stale_after {
            return false;
        }
        tracing::warn!(turn = %self.turn_id, elapsed_secs = elapsed.as_secs(), "Session went stale");
        self.force(
            SessionState::TimedOut,
            format!("No terminal event from the backend after {}s", elapsed.as_secs()),
            now,
        )
    }

    pub fn cancel_locally(&mut self, reason: &str) -> bool {
        self.cancel_locally_at(reason, Instant::now())
    }

    /// Mark the turn interrupted without waiting for the backend.
    pub fn cancel_locally_at(&mut self, reason: &str, now: Instant) -> bool {
        self.force(
            SessionState::Interrupted,
            non_empty(reason.to_string(), "Cancelled by user"),
            now,
        )
    }

    pub fn fail(&mut self, err: &StreamError) -> bool {
        self.fail_at(err, Instant::now())
    }

    /// End the turn because the connection failed. Deadline errors end it
    /// as timed out. Per-frame errors are ignored.
    pub fn fail_at(&mut self, err: &StreamError, now: Instant) -> bool {
        if !err.terminates_session() {
            return false;
        }
        let state = if err.is_timeout() {
            SessionState::TimedOut
        } else {
            SessionState::Failed
        };
        self.force(state, err.user_message(), now)
    }

    pub fn finish_unterminated(&mut self) -> bool {
        self.finish_unterminated_at(Instant::now())
    }

    /// The body ended and no terminal event was seen.
    pub fn finish_unterminated_at(&mut self, now: Instant) -> bool {
        self.fail_at(&StreamError::NoTerminalEvent, now)
    }
}

fn non_empty(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::{
        ConnectedEvent, ErrorEvent, InterruptedEvent, ProgressEvent, ToolCompleteEvent,
        ToolStartEvent,
    };
    use serde_json::json;

    fn session() -> (StreamingSession, Instant) {
        let start = Instant::now();
        (StreamingSession::started_at(TurnId::new(), start), start)
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn final_event(content: &str) -> DomainEvent {
        DomainEvent::Final(FinalEvent {
            content: content.to_string(),
            ..Default::default()
        })
    }

    fn tool_complete(tool: &str, success: bool) -> DomainEvent {
        DomainEvent::ToolComplete(ToolCompleteEvent {
            tool: tool.to_string(),
            success,
        })
    }

    /// Exactly one of final, error, still-streaming.
    fn assert_outcome_invariant(s: &StreamingSession) {
        let outcomes = [
            s.final_response().is_some(),
            s.error().is_some(),
            s.is_active(),
        ];
        assert_eq!(outcomes.iter().filter(|b| **b).count(), 1, "{:?}", s.state());
    }

    #[test]
    fn test_new_session_is_idle_and_active() {
        let (s, _) = session();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.is_active());
        assert_outcome_invariant(&s);
    }

    #[test]
    fn test_happy_path() {
        let (mut s, start) = session();
        s.ingest_at(
            DomainEvent::Connected(ConnectedEvent {
                session_id: "st-1".to_string(),
            }),
            start + secs(1),
        );
        assert_eq!(s.state(), SessionState::Streaming);
        s.ingest_at(
            DomainEvent::ToolStart(ToolStartEvent {
                tool: "oracle__run_sql".to_string(),
                description: String::new(),
            }),
            start + secs(2),
        );
        assert_eq!(s.current_tool(), Some("Run Sql"));
        s.ingest_at(tool_complete("oracle__run_sql", true), start + secs(3));
        s.ingest_at(final_event("Answer: 42"), start + secs(4));

        assert_eq!(s.state(), SessionState::Completed);
        assert_eq!(s.stream_id(), Some("st-1"));
        assert_eq!(s.completed_tools(), ["Run Sql".to_string()]);
        assert_eq!(s.final_response(), Some("Answer: 42"));
        assert_eq!(s.current_tool(), None);
        assert_eq!(s.terminal_index(), Some(3));
        assert_eq!(s.elapsed_at(start + secs(100)), secs(4));
        assert!(!s.is_active());
        assert_outcome_invariant(&s);
    }

    #[test]
    fn test_failed_tools_are_not_completed() {
        let (mut s, _) = session();
        s.ingest(tool_complete("oracle__run_sql", false));
        s.ingest(tool_complete("oracle__describe", true));
        s.ingest(tool_complete("oracle__describe", true));
        assert_eq!(s.completed_tools(), ["Describe".to_string()]);
    }

    #[test]
    fn test_first_terminal_event_wins() {
        let (mut s, _) = session();
        s.ingest(DomainEvent::Error(ErrorEvent {
            message: "db down".to_string(),
        }));
        s.ingest(final_event("too late"));

        assert_eq!(s.state(), SessionState::Failed);
        assert_eq!(s.error(), Some("db down"));
        assert_eq!(s.final_response(), None);
        assert_eq!(s.events().len(), 2);
        assert_eq!(s.terminal_index(), Some(0));
        assert_outcome_invariant(&s);
    }

    #[test]
    fn test_progress_updates_phase_and_steps() {
        let (mut s, _) = session();
        let details = json!({"phase": "sql_generation", "currentStep": 2, "totalSteps": 8});
        s.ingest(DomainEvent::Progress(ProgressEvent {
            phase: "sql_generation".to_string(),
            step: "generate".to_string(),
            message: String::new(),
            details: details.as_object().cloned().unwrap(),
        }));
        assert_eq!(s.current_phase(), Some("sql_generation"));
        assert_eq!(s.step_info(), Some(StepInfo { current: 2, total: 8 }));
        assert_eq!(s.step_info().unwrap().fraction(), 0.25);
    }

    #[test]
    fn test_question_and_pause_do_not_terminate() {
        let (mut s, _) = session();
        s.ingest(DomainEvent::AgentQuestion(AgentQuestionEvent {
            question: "Which year?".to_string(),
            options: vec!["2024".to_string(), "2025".to_string()],
        }));
        s.ingest(DomainEvent::ExecutionPaused(ExecutionPausedEvent {
            reason: "awaiting_input".to_string(),
            message: String::new(),
        }));
        assert!(s.is_active());
        assert_eq!(s.pending_question().unwrap().options.len(), 2);
        assert_eq!(s.pause().unwrap().reason, "awaiting_input");
    }

    #[test]
    fn test_staleness_measured_from_start() {
        let (mut s, start) = session();
        s.ingest_at(DomainEvent::Heartbeat, start + secs(500));
        assert!(!s.check_staleness_at(start + secs(600)));
        assert!(s.is_active());

        // Heartbeats do not extend the window
        assert!(s.check_staleness_at(start + secs(700)));
        assert_eq!(s.state(), SessionState::TimedOut);
        assert!(s.error().unwrap().contains("700s"));
        assert_eq!(s.terminal_index(), None);
        assert_outcome_invariant(&s);

        // Already terminal
        assert!(!s.check_staleness_at(start + secs(5000)));
    }

    #[test]
    fn test_terminated_len_marks_late_events() {
        let (mut s, start) = session();
        s.ingest_at(DomainEvent::Heartbeat, start + secs(1));
        s.cancel_locally_at("stop", start + secs(2));
        s.ingest_at(final_event("late"), start + secs(2));

        assert_eq!(s.terminated_len(), Some(1));
        assert_eq!(s.events().len(), 2);
        assert_eq!(s.state(), SessionState::Interrupted);
    }

    #[test]
    fn test_custom_stale_window() {
        let (s, start) = session();
        let mut s = s.with_stale_after(secs(5));
        assert!(s.check_staleness_at(start + secs(6)));
        assert_eq!(s.state(), SessionState::TimedOut);
    }

    #[test]
    fn test_local_cancel_ignores_late_final() {
        let (mut s, start) = session();
        s.begin();
        assert!(s.cancel_locally_at("", start + secs(2)));
        s.ingest_at(
            DomainEvent::Interrupted(InterruptedEvent {
                message: "ack".to_string(),
            }),
            start + secs(3),
        );
        s.ingest_at(final_event("late"), start + secs(4));

        assert_eq!(s.state(), SessionState::Interrupted);
        assert_eq!(s.error(), Some("Cancelled by user"));
        assert_eq!(s.final_response(), None);
        assert_eq!(s.events().len(), 2);
        assert_eq!(s.elapsed_at(start + secs(10)), secs(2));
        assert_outcome_invariant(&s);
    }

    #[test]
    fn test_fail_classifies_timeouts() {
        let (mut s, _) = session();
        assert!(!s.fail(&StreamError::MalformedFrame {
            event_type: None,
            raw: String::new(),
            cause: String::new(),
        }));
        assert!(s.is_active());

        assert!(s.fail(&StreamError::Timeout { duration_secs: 300 }));
        assert_eq!(s.state(), SessionState::TimedOut);

        let (mut s, _) = session();
        s.fail(&StreamError::ConnectionLost {
            message: "reset".to_string(),
        });
        assert_eq!(s.state(), SessionState::Failed);
        assert_outcome_invariant(&s);
    }

    #[test]
    fn test_finish_unterminated() {
        let (mut s, _) = session();
        s.ingest(DomainEvent::Heartbeat);
        assert!(s.finish_unterminated());
        assert_eq!(s.state(), SessionState::Failed);
        assert!(s.error().unwrap().contains("No terminal event"));

        let (mut done, _) = session();
        done.ingest(final_event("ok"));
        assert!(!done.finish_unterminated());
        assert_eq!(done.state(), SessionState::Completed);
    }

    #[test]
    fn test_empty_error_message_gets_fallback() {
        let (mut s, _) = session();
        s.ingest(DomainEvent::Error(ErrorEvent::default()));
        assert_eq!(s.error(), Some("The backend reported an error"));
    }

    #[test]
    fn test_replay_is_identical() {
        let (mut a, start) = session();
        let mut b = StreamingSession::started_at(a.turn_id(), start);
        let script = vec![
            DomainEvent::Heartbeat,
            tool_complete("x__y", true),
            final_event("z"),
            final_event("ignored"),
        ];
        for (i, event) in script.into_iter().enumerate() {
            let at = start + secs(i as u64);
            a.ingest_at(event.clone(), at);
            b.ingest_at(event, at);
        }
        assert_eq!(a.state(), b.state());
        assert_eq!(a.events(), b.events());
        assert_eq!(a.final_response(), b.final_response());
    }
}
