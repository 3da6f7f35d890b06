//! Session management module.
//!
//! A session correlates a sequence of stateless requests with one running
//! worker. This module provides session identification, the capacity-1
//! mailbox pair used for request/reply hand-off, and the registry that owns
//! all live sessions.

mod id;
mod mailbox;
mod registry;

pub use id::SessionId;
pub use mailbox::{mailbox_pair, FrontHalf, OfferError, PollError, WorkerHalf};
pub use registry::{Session, SessionRegistry};
