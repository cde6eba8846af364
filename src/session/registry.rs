//! Bounded history of recent sessions, for replaying past turns.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::{StreamingSession, TurnId};

pub const DEFAULT_CAPACITY: usize = 20;
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(300);

/// Recent sessions, oldest first.
///
/// Holds at most `capacity` sessions; inserting past that evicts the oldest.
/// [`SessionRegistry::sweep_at`] times out stale live sessions and drops
/// finished ones older than the retention window.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: VecDeque<StreamingSession>,
    capacity: usize,
    retention: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_RETENTION)
    }
}

impl SessionRegistry {
    pub fn new(capacity: usize, retention: Duration) -> Self {
        Self {
            sessions: VecDeque::new(),
            capacity: capacity.max(1),
            retention,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Add a session, returning any evicted to stay within capacity.
    pub fn insert(&mut self, session: StreamingSession) -> Vec<StreamingSession> {
        self.sessions.retain(|s| s.turn_id() != session.turn_id());
        self.sessions.push_back(session);

        let mut evicted = Vec::new();
        while self.sessions.len() > self.capacity {
            if let Some(oldest) = self.sessions.pop_front() {
                tracing::debug!(turn = %oldest.turn_id(), "Evicting session from history");
                evicted.push(oldest);
            }
        }
        evicted
    }

    pub fn get(&self, turn_id: TurnId) -> Option<&StreamingSession> {
        self.sessions.iter().find(|s| s.turn_id() == turn_id)
    }

    pub fn get_mut(&mut self, turn_id: TurnId) -> Option<&mut StreamingSession> {
        self.sessions.iter_mut().find(|s| s.turn_id() == turn_id)
    }

    pub fn remove(&mut self, turn_id: TurnId) -> Option<StreamingSession> {
        let index = self.sessions.iter().position(|s| s.turn_id() == turn_id)?;
        self.sessions.remove(index)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &StreamingSession> {
        self.sessions.iter()
    }

    pub fn latest(&self) -> Option<&StreamingSession> {
        self.sessions.back()
    }

    pub fn sweep(&mut self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Time out stale sessions, then drop finished sessions past retention.
    /// Returns how many were dropped.
    pub fn sweep_at(&mut self, now: Instant) -> usize {
        for session in self.sessions.iter_mut() {
            session.check_staleness_at(now);
        }
        let before = self.sessions.len();
        let retention = self.retention;
        self.sessions.retain(|s| match s.finished_at() {
            Some(finished) => now.saturating_duration_since(finished) <= retention,
            None => true,
        });
        before - self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use crate::sse::{DomainEvent, FinalEvent};

    fn finished(start: Instant, at: Duration) -> StreamingSession {
        let mut s = StreamingSession::started_at(TurnId::new(), start);
        s.ingest_at(DomainEvent::Final(FinalEvent::default()), start + at);
        s
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut registry = SessionRegistry::new(3, DEFAULT_RETENTION);
        let ids: Vec<TurnId> = (0..5)
            .map(|_| {
                let s = StreamingSession::new(TurnId::new());
                let id = s.turn_id();
                registry.insert(s);
                id
            })
            .collect();

        assert_eq!(registry.len(), 3);
        assert!(registry.get(ids[0]).is_none());
        assert!(registry.get(ids[1]).is_none());
        assert!(registry.get(ids[4]).is_some());
        assert_eq!(registry.latest().map(|s| s.turn_id()), Some(ids[4]));
    }

    #[test]
    fn test_insert_returns_evicted() {
        let mut registry = SessionRegistry::new(1, DEFAULT_RETENTION);
        let first = StreamingSession::new(TurnId::new());
        let first_id = first.turn_id();
        assert!(registry.insert(first).is_empty());
        let evicted = registry.insert(StreamingSession::new(TurnId::new()));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].turn_id(), first_id);
    }

    #[test]
    fn test_reinsert_replaces() {
        let mut registry = SessionRegistry::default();
        let s = StreamingSession::new(TurnId::new());
        let id = s.turn_id();
        registry.insert(s.clone());
        registry.insert(s);
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(id).is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sweep_times_out_and_expires() {
        let start = Instant::now();
        let mut registry = SessionRegistry::new(10, Duration::from_secs(300));

        let live = StreamingSession::started_at(TurnId::new(), start);
        let live_id = live.turn_id();
        registry.insert(live);
        registry.insert(finished(start, Duration::from_secs(1)));

        // Nothing stale or expired yet
        assert_eq!(registry.sweep_at(start + Duration::from_secs(100)), 0);

        // The live session goes stale at 600s; the finished one expires at 301s
        let dropped = registry.sweep_at(start + Duration::from_secs(700));
        assert_eq!(dropped, 1);
        let live = registry.get(live_id).unwrap();
        assert_eq!(live.state(), SessionState::TimedOut);

        // And the newly timed-out session expires after its own retention
        assert_eq!(registry.sweep_at(start + Duration::from_secs(1100)), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_mut() {
        let mut registry = SessionRegistry::default();
        let s = StreamingSession::new(TurnId::new());
        let id = s.turn_id();
        registry.insert(s);
        registry.get_mut(id).unwrap().begin();
        assert_eq!(registry.get(id).unwrap().state(), SessionState::Streaming);
    }
}
