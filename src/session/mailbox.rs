//! Capacity-1 hand-off mailboxes.
//!
//! Each session owns exactly one mailbox pair: a slot carrying the request
//! from the front door to the worker, and a slot carrying the reply back.
//! Capacity 1 plus a non-blocking `offer` is the mechanism that turns two
//! concurrent requests for the same session into an observable error instead
//! of undefined interleaving.

use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use crate::message::Message;

/// Failure of a non-blocking [`FrontHalf::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferError {
    /// The slot is already occupied: another exchange is in flight.
    Full,
    /// The worker side has been dropped.
    Closed,
}

/// Failure of a bounded [`FrontHalf::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollError {
    /// No reply arrived within the wait bound. A reply placed after the
    /// deadline stays in the slot; it is not consumed by the expired poll.
    Timeout,
    /// The worker side has been dropped.
    Closed,
    /// Another caller is already polling this session's reply slot.
    Busy,
}

/// Create a linked mailbox pair.
///
/// The [`FrontHalf`] stays with the session; the [`WorkerHalf`] is moved into
/// the worker task. Both directions have capacity exactly 1.
pub fn mailbox_pair() -> (FrontHalf, WorkerHalf) {
    let (to_worker, inbox) = mpsc::channel(1);
    let (replies, from_worker) = mpsc::channel(1);
    (
        FrontHalf {
            to_worker,
            from_worker: Mutex::new(from_worker),
        },
        WorkerHalf { inbox, replies },
    )
}

/// The request-handler side of a mailbox pair.
#[derive(Debug)]
pub struct FrontHalf {
    to_worker: mpsc::Sender<Message>,
    from_worker: Mutex<mpsc::Receiver<Message>>,
}

impl FrontHalf {
    /// Non-blocking attempt to place a message in the worker's inbox.
    ///
    /// An occupied slot fails fast; it never overwrites the in-flight
    /// message.
    pub fn offer(&self, msg: Message) -> Result<(), OfferError> {
        self.to_worker.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => OfferError::Full,
            mpsc::error::TrySendError::Closed(_) => OfferError::Closed,
        })
    }

    /// Wait up to `wait` for the worker's reply.
    ///
    /// The receiver is `try_lock`ed, so a second concurrent poller fails
    /// fast with [`PollError::Busy`] instead of queueing behind the first.
    pub async fn poll(&self, wait: Duration) -> Result<Message, PollError> {
        let mut rx = self.from_worker.try_lock().map_err(|_| PollError::Busy)?;
        match tokio::time::timeout(wait, rx.recv()).await {
            Ok(Some(msg)) => Ok(msg),
            Ok(None) => Err(PollError::Closed),
            Err(_) => Err(PollError::Timeout),
        }
    }
}

/// The worker side of a mailbox pair.
#[derive(Debug)]
pub struct WorkerHalf {
    pub(crate) inbox: mpsc::Receiver<Message>,
    pub(crate) replies: mpsc::Sender<Message>,
}
