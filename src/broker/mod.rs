//! The front-door relay broker.
//!
//! The broker implements the per-request relay protocol: resolve or create a
//! session, hand the message to its worker through the capacity-1 mailboxes,
//! wait a bounded time for the reply, and clean up on terminal failure. It is
//! stateless per request; all shared state lives in the [`SessionRegistry`].

pub mod reaper;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{RelayError, Result};
use crate::message::Message;
use crate::session::{OfferError, PollError, Session, SessionId, SessionRegistry};
use crate::worker::{self, WorkerFactory};

/// Tunables for the relay protocol.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Bound on waiting for a worker's reply within one exchange.
    pub reply_timeout: Duration,
    /// Maximum number of concurrently alive sessions.
    pub max_sessions: usize,
    /// Independent give-up bound for a worker awaiting its inbox.
    pub worker_idle: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_secs(10),
            max_sessions: 64,
            worker_idle: Duration::from_secs(300),
        }
    }
}

/// The stateless relay handler shared across all requests.
pub struct Broker {
    registry: Arc<SessionRegistry>,
    factory: Arc<dyn WorkerFactory>,
    config: BrokerConfig,
    /// First exchanges in flight, not yet registered. Counted against
    /// `max_sessions` so concurrent no-session requests cannot spawn
    /// workers past the limit.
    starting: AtomicUsize,
}

impl Broker {
    /// Create a broker with an empty registry.
    pub fn new(config: BrokerConfig, factory: Arc<dyn WorkerFactory>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            factory,
            config,
            starting: AtomicUsize::new(0),
        }
    }

    /// Handle to the session registry, for the reaper and introspection.
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.registry.count()
    }

    /// Relay one annotated message to its worker and return the reply.
    ///
    /// A message without a session reference starts a new session; one with
    /// a reference resumes it. Either way the reply comes back stamped with
    /// the session id.
    pub async fn relay(&self, msg: Message) -> Result<Message> {
        match msg.session_field() {
            None => self.first_exchange(msg).await,
            Some(raw) => {
                let id: SessionId = raw.parse()?;
                let session = self.registry.lookup(&id)?;
                match self.exchange(&session, msg).await {
                    Ok(reply) => Ok(reply),
                    // Ambiguous which of the two conflicting requests is the
                    // stale one, so the session stays registered and only
                    // this caller fails.
                    Err(RelayError::SessionBusy) => Err(RelayError::SessionBusy),
                    Err(err) => {
                        // A half-broken session must never be resumable.
                        let _ = self.registry.remove(&id);
                        debug!(session = %id, %err, "session removed after failed exchange");
                        Err(err)
                    }
                }
            }
        }
    }

    /// Reserve a session slot against `max_sessions`.
    ///
    /// Registered sessions and in-flight first exchanges both count, so the
    /// bound holds even when several no-session requests arrive at once.
    fn reserve_slot(&self) -> Result<()> {
        self.starting
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |starting| {
                if self.registry.count() + starting >= self.config.max_sessions {
                    None
                } else {
                    Some(starting + 1)
                }
            })
            .map(|_| ())
            .map_err(|_| RelayError::AtCapacity)
    }

    fn release_slot(&self) {
        self.starting.fetch_sub(1, Ordering::AcqRel);
    }

    /// Start a session and run its first exchange.
    ///
    /// The session is registered only after the exchange succeeds; on any
    /// failure it is discarded without ever becoming visible.
    async fn first_exchange(&self, msg: Message) -> Result<Message> {
        self.reserve_slot()?;

        let worker = match self.factory.create() {
            Ok(worker) => worker,
            Err(err) => {
                self.release_slot();
                return Err(err);
            }
        };
        let (session, half) = self.registry.create();
        tokio::spawn(worker::run(worker, half, self.config.worker_idle));

        match self.exchange(&session, msg).await {
            Ok(reply) => {
                // Register before releasing the reservation so the slot is
                // never double-counted nor briefly free.
                let inserted = self.registry.insert(Arc::clone(&session));
                self.release_slot();
                inserted?;
                info!(session = %session.id, "session created");
                Ok(reply)
            }
            Err(err) => {
                let _ = session.offer(Message::stop());
                self.release_slot();
                debug!(%err, "first exchange failed, session discarded");
                Err(err)
            }
        }
    }

    /// One request/reply hand-off against a session's mailbox pair.
    async fn exchange(&self, session: &Session, msg: Message) -> Result<Message> {
        session.touch();
        session.offer(msg).map_err(|e| match e {
            OfferError::Full => RelayError::SessionBusy,
            OfferError::Closed => RelayError::WorkerGone,
        })?;

        match session.poll(self.config.reply_timeout).await {
            Ok(mut reply) => {
                reply.set_session(session.id);
                session.touch();
                Ok(reply)
            }
            Err(PollError::Timeout) => {
                // Best-effort: ask the abandoned worker to give up. A reply
                // racing this timeout stays in the outbound slot and is
                // discarded with the session; it is never delivered.
                let _ = session.offer(Message::stop());
                Err(RelayError::ReplyTimeout)
            }
            Err(PollError::Closed) => Err(RelayError::WorkerGone),
            Err(PollError::Busy) => Err(RelayError::SessionBusy),
        }
    }

    /// Discard all sessions, asking each worker to stop. Shutdown teardown;
    /// sessions are in-memory only and nothing is persisted.
    pub fn shutdown(&self) {
        if let Ok(sessions) = self.registry.drain() {
            for session in &sessions {
                let _ = session.offer(Message::stop());
            }
            if !sessions.is_empty() {
                info!(count = sessions.len(), "discarded sessions at shutdown");
            }
        }
    }
}
