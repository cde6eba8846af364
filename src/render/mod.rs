//! Render projection
//!
//! Derives displayable fragments from a [`StreamingSession`]. Projection is
//! a pure function of the session, the verbosity and the supplied `now`, so
//! a host can re-project on every repaint without touching the stream.

mod fragment;
mod verbosity;

pub use fragment::{Fragment, FragmentKind};
pub use verbosity::{ParseVerbosityError, Verbosity};

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::session::{SessionState, StepInfo, StreamingSession};
use crate::sse::DomainEvent;

/// Default elapsed time after which a live turn shows a "still working" line.
pub const DEFAULT_LONG_RUNNING_AFTER: Duration = Duration::from_secs(30);

/// Shown once a turn has ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub state: SessionState,
    pub elapsed: Duration,
    pub tool_count: usize,
}

impl Summary {
    pub fn text(&self) -> String {
        let tools = match self.tool_count {
            1 => "1 tool".to_string(),
            n => format!("{} tools", n),
        };
        format!(
            "{} in {:.1}s, {} used",
            capitalize(self.state.label()),
            self.elapsed.as_secs_f64(),
            tools
        )
    }
}

/// What the turn is doing right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveStatus {
    pub phase: Option<String>,
    pub tool: Option<String>,
    pub steps: Option<StepInfo>,
    pub elapsed: Duration,
}

impl LiveStatus {
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(phase) = &self.phase {
            parts.push(phase.replace('_', " "));
        }
        if let Some(tool) = &self.tool {
            parts.push(format!("running {}", tool));
        }
        if let Some(steps) = self.steps {
            parts.push(format!("step {}/{}", steps.current, steps.total));
        }
        parts.push(format!("{}s", self.elapsed.as_secs()));
        parts.join(" | ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub fragments: Vec<Fragment>,
    /// Present once the session is terminal
    pub summary: Option<Summary>,
    /// Present while streaming
    pub live: Option<LiveStatus>,
    /// Present while streaming past the long-running threshold
    pub still_working: Option<String>,
}

impl Projection {
    /// Fragments after the first `seen`, for hosts that append as they go.
    pub fn fragments_since(&self, seen: usize) -> &[Fragment] {
        &self.fragments[seen.min(self.fragments.len())..]
    }

    pub fn is_terminal(&self) -> bool {
        self.summary.is_some()
    }
}

/// Projection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projector {
    pub verbosity: Verbosity,
    pub long_running_after: Duration,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new(Verbosity::default())
    }
}

impl Projector {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            long_running_after: DEFAULT_LONG_RUNNING_AFTER,
        }
    }

    pub fn with_long_running_after(mut self, threshold: Duration) -> Self {
        self.long_running_after = threshold;
        self
    }

    pub fn project(&self, session: &StreamingSession, now: Instant) -> Projection {
        let fragments = self.fragments(session);
        let elapsed = session.elapsed_at(now);

        if session.state().is_terminal() {
            return Projection {
                fragments,
                summary: Some(Summary {
                    state: session.state(),
                    elapsed,
                    tool_count: session.completed_tools().len(),
                }),
                live: None,
                still_working: None,
            };
        }

        let live = (session.state() == SessionState::Streaming).then(|| LiveStatus {
            phase: session.current_phase().map(String::from),
            tool: session.current_tool().map(String::from),
            steps: session.step_info(),
            elapsed,
        });
        let still_working = (session.state() == SessionState::Streaming
            && elapsed > self.long_running_after)
            .then(|| format!("Still working... ({}s)", elapsed.as_secs()));

        Projection {
            fragments,
            summary: None,
            live,
            still_working,
        }
    }

    fn fragments(&self, session: &StreamingSession) -> Vec<Fragment> {
        let events = session.events();
        let with_sql = self.verbosity != Verbosity::Minimal;

        // Minimal and Normal stop where the turn ended
        let visible = match (self.verbosity, session.terminated_len()) {
            (Verbosity::Detailed, _) | (_, None) => events,
            (_, Some(end)) => &events[..end.min(events.len())],
        };

        let mut fragments: Vec<Fragment> = visible
            .iter()
            .filter(|recorded| self.selects(&recorded.event))
            .map(|recorded| Fragment::for_event(&recorded.event, recorded.offset, with_sql))
            .collect();

        if session.state().is_terminal() && session.terminal_index().is_none() {
            let message = session.error().unwrap_or("no terminal event received");
            fragments.push(Fragment::forced_outcome(session.state(), message));
        }
        fragments
    }

    fn selects(&self, event: &DomainEvent) -> bool {
        match self.verbosity {
            Verbosity::Detailed => true,
            Verbosity::Normal => matches!(
                event,
                DomainEvent::ToolStart(_)
                    | DomainEvent::ToolComplete(_)
                    | DomainEvent::ExecutionPaused(_)
                    | DomainEvent::AgentQuestion(_)
            ) || event.is_terminal(),
            Verbosity::Minimal => event.is_terminal(),
        }
    }
}

/// Project with the default long-running threshold.
pub fn project(session: &StreamingSession, verbosity: Verbosity, now: Instant) -> Projection {
    Projector::new(verbosity).project(session, now)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
