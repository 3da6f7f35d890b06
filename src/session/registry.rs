//! Session storage and lifecycle.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use super::mailbox::{self, FrontHalf, OfferError, PollError, WorkerHalf};
use super::SessionId;
use crate::error::{RelayError, Result};
use crate::message::Message;

/// A relay session: the correlation unit binding a sequence of stateless
/// requests to one running worker.
///
/// The session owns the front half of its mailbox pair; the worker half is
/// moved into the worker task at spawn time. There is no back-reference to
/// the running task.
#[derive(Debug)]
pub struct Session {
    /// Unique identifier.
    pub id: SessionId,
    mailbox: FrontHalf,
    last_active: RwLock<Instant>,
}

impl Session {
    fn new(id: SessionId, mailbox: FrontHalf) -> Self {
        Self {
            id,
            mailbox,
            last_active: RwLock::new(Instant::now()),
        }
    }

    /// Refresh the last-activity timestamp.
    pub fn touch(&self) {
        if let Ok(mut t) = self.last_active.write() {
            *t = Instant::now();
        }
    }

    /// Idle duration since the last hand-off attempt.
    pub fn idle(&self) -> Duration {
        self.last_active
            .read()
            .map(|t| t.elapsed())
            .unwrap_or_default()
    }

    /// Non-blocking offer into the worker's inbox.
    pub fn offer(&self, msg: Message) -> std::result::Result<(), OfferError> {
        self.mailbox.offer(msg)
    }

    /// Bounded wait for the worker's reply.
    pub async fn poll(&self, wait: Duration) -> std::result::Result<Message, PollError> {
        self.mailbox.poll(wait).await
    }

    /// Rewind the last-activity timestamp, for sweep tests.
    #[cfg(test)]
    pub(crate) fn backdate(&self, by: Duration) {
        if let Ok(mut t) = self.last_active.write() {
            *t = Instant::now().checked_sub(by).unwrap_or_else(Instant::now);
        }
    }
}

/// Thread-safe registry of live sessions.
///
/// Membership is mutated only by the front door (insert after a successful
/// first exchange, remove on terminal failure) and the reaper (sweep).
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate a fresh session with its mailbox pair.
    ///
    /// The session is NOT inserted: a session that fails its first exchange
    /// must never become visible. Call [`insert`](Self::insert) once the
    /// first exchange succeeds.
    pub fn create(&self) -> (Arc<Session>, WorkerHalf) {
        let (front, worker) = mailbox::mailbox_pair();
        (Arc::new(Session::new(SessionId::new(), front)), worker)
    }

    /// Register a session, making it resumable. Idempotent.
    pub fn insert(&self, session: Arc<Session>) -> Result<()> {
        let mut sessions = self.sessions.write().map_err(|_| RelayError::LockPoisoned)?;
        sessions.entry(session.id).or_insert(session);
        Ok(())
    }

    /// Resolve a session id.
    ///
    /// Signals `SessionNotFound` on a miss. Staleness is not checked here;
    /// expiry is the reaper's concern.
    pub fn lookup(&self, id: &SessionId) -> Result<Arc<Session>> {
        let sessions = self.sessions.read().map_err(|_| RelayError::LockPoisoned)?;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| RelayError::SessionNotFound(id.to_string()))
    }

    /// Remove a session. Idempotent; returns the removed session if any.
    pub fn remove(&self, id: &SessionId) -> Result<Option<Arc<Session>>> {
        let mut sessions = self.sessions.write().map_err(|_| RelayError::LockPoisoned)?;
        Ok(sessions.remove(id))
    }

    /// Remove every session idle longer than `max_idle`.
    ///
    /// Returns the number of sessions removed. Dropping a session closes its
    /// mailbox pair; a worker still blocked on its inbox will observe the
    /// closed channel (or hit its own give-up timeout) and exit.
    pub fn sweep(&self, max_idle: Duration) -> Result<usize> {
        let mut sessions = self.sessions.write().map_err(|_| RelayError::LockPoisoned)?;
        let before = sessions.len();
        sessions.retain(|_, session| session.idle() < max_idle);
        Ok(before - sessions.len())
    }

    /// Number of live sessions.
    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Remove and return all sessions, for shutdown teardown.
    pub fn drain(&self) -> Result<Vec<Arc<Session>>> {
        let mut sessions = self.sessions.write().map_err(|_| RelayError::LockPoisoned)?;
        Ok(sessions.drain().map(|(_, s)| s).collect())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
