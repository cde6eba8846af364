//! Turn driver.
//!
//! Runs one conversation turn end to end: opens the stream, feeds each
//! event into a fresh [`StreamingSession`], and calls the observer after
//! every change. Waits on the next event, the turn deadline, the stale
//! window and a cancel signal at once; whichever fires first decides the
//! next step. Cancelling marks the session interrupted immediately and
//! sends the backend interrupt in the background.

use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::StreamError;
use crate::host::{ConversationRequest, HostClient, InterruptRequest};
use crate::session::{StreamingSession, TurnId};
use crate::traits::HttpClient;

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOptions {
    /// Deadline for the whole turn
    pub deadline: Duration,
    /// Inactivity after which the turn is timed out
    pub stale_after: Duration,
}

impl Default for TurnOptions {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(300),
            stale_after: crate::session::DEFAULT_STALE_AFTER,
        }
    }
}

impl TurnOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            deadline: config.request_timeout,
            stale_after: config.stale_after,
        }
    }
}

/// Sender half of a turn's cancel signal.
#[derive(Debug)]
pub struct CancelHandle(oneshot::Sender<String>);

impl CancelHandle {
    /// Request cancellation. Returns false if the turn already finished.
    pub fn cancel(self, reason: impl Into<String>) -> bool {
        self.0.send(reason.into()).is_ok()
    }
}

/// Receiver half, handed to [`TurnDriver::run`].
#[derive(Debug)]
pub struct CancelSignal(oneshot::Receiver<String>);

pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = oneshot::channel();
    (CancelHandle(tx), CancelSignal(rx))
}

pub struct TurnDriver<C: HttpClient> {
    host: HostClient<C>,
    options: TurnOptions,
}

enum Step {
    Changed,
    Unchanged,
    Done,
}

impl<C: HttpClient + 'static> TurnDriver<C> {
    pub fn new(host: HostClient<C>, options: TurnOptions) -> Self {
        Self { host, options }
    }

    /// Drive one turn to a terminal state and return its session.
    ///
    /// `observer` sees the session after it starts and after every
    /// ingested event or forced outcome. It runs to completion before the
    /// next event is read.
    pub async fn run<F>(
        &self,
        request: &ConversationRequest,
        cancel: CancelSignal,
        mut observer: F,
    ) -> StreamingSession
    where
        F: FnMut(&StreamingSession),
    {
        let mut session =
            StreamingSession::new(TurnId::new()).with_stale_after(self.options.stale_after);
        session.begin();
        observer(&session);

        let deadline = Instant::now().checked_add(self.options.deadline);
        if deadline.is_none() {
            debug!(deadline = ?self.options.deadline, "Deadline out of range; turn is unbounded");
        }
        let mut cancel = cancel.0;
        let mut cancel_open = true;

        let opened = loop {
            tokio::select! {
                biased;
                reason = &mut cancel, if cancel_open => match reason {
                    Ok(reason) => {
                        session.cancel_locally(&reason);
                        observer(&session);
                        return session;
                    }
                    Err(_) => cancel_open = false,
                },
                _ = sleep_until_some(deadline) => break Err(self.deadline_error()),
                opened = self.host.open_conversation(request) => break opened,
            }
        };

        let mut events = match opened {
            Ok(events) => events,
            Err(err) => {
                warn!(code = err.error_code(), error = %err, "Could not open conversation");
                session.fail(&err);
                observer(&session);
                return session;
            }
        };

        // Staleness counts from the start of the turn, so its deadline is fixed
        let stale_at = session
            .stale_after()
            .checked_add(Duration::from_millis(1))
            .and_then(|window| session.start_time().checked_add(window))
            .map(Instant::from_std);

        loop {
            let step = tokio::select! {
                biased;
                reason = &mut cancel, if cancel_open => match reason {
                    Ok(reason) => {
                        self.cancel(&mut session, &reason);
                        Step::Done
                    }
                    Err(_) => {
                        // Handle dropped; this turn can no longer be cancelled
                        cancel_open = false;
                        Step::Unchanged
                    }
                },
                _ = sleep_until_some(deadline) => {
                    session.fail(&self.deadline_error());
                    Step::Done
                }
                _ = sleep_until_some(stale_at) => {
                    if session.check_staleness() {
                        Step::Done
                    } else {
                        Step::Unchanged
                    }
                }
                next = events.next() => match next {
                    Some(Ok(event)) => {
                        debug!(event = event.event_type_name(), "Event");
                        session.ingest(event);
                        if session.is_active() {
                            Step::Changed
                        } else {
                            Step::Done
                        }
                    }
                    Some(Err(err)) if !err.terminates_session() => {
                        warn!(code = err.error_code(), error = %err, "Dropping malformed frame");
                        Step::Unchanged
                    }
                    Some(Err(err)) => {
                        warn!(code = err.error_code(), error = %err, "Stream failed");
                        session.fail(&err);
                        Step::Done
                    }
                    None => {
                        if session.finish_unterminated() {
                            warn!(turn = %session.turn_id(), "Stream ended without a terminal event");
                        }
                        Step::Done
                    }
                },
            };

            match step {
                Step::Unchanged => {}
                Step::Changed => observer(&session),
                Step::Done => {
                    observer(&session);
                    break;
                }
            }
        }

        info!(
            turn = %session.turn_id(),
            state = session.state().label(),
            events = session.events().len(),
            "Turn complete"
        );
        session
    }

    fn deadline_error(&self) -> StreamError {
        StreamError::Timeout {
            duration_secs: self.options.deadline.as_secs(),
        }
    }

    fn cancel(&self, session: &mut StreamingSession, reason: &str) {
        session.cancel_locally(reason);

        let Some(stream_id) = session.stream_id().map(String::from) else {
            debug!("Cancelled before the backend assigned a stream id; no interrupt sent");
            return;
        };
        let host = self.host.clone();
        let request = if reason.is_empty() {
            InterruptRequest::default()
        } else {
            InterruptRequest::new(reason)
        };
        tokio::spawn(async move {
            if let Err(err) = host.interrupt(&stream_id, &request).await {
                warn!(stream_id = %stream_id, error = %err, "Interrupt request failed");
            }
        });
    }
}

/// Sleep until `at`, or forever when there is no such instant.
async fn sleep_until_some(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
