//! # session-relay
//!
//! Session broker relaying stateless HTTP requests to long-lived in-process
//! workers.
//!
//! A client drives a multi-round-trip interaction with a stateful worker
//! without holding any persistent connection: each POST is routed to the same
//! running worker through a session id. Hand-off happens over capacity-1
//! mailboxes, so concurrent use of one session fails fast instead of
//! interleaving. Abandoned sessions time out, are asked to stop, and are
//! swept by a periodic reaper.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use session_relay::api::{self, AppState, ServerConfig};
//! use session_relay::broker::{reaper, Broker, BrokerConfig};
//! use session_relay::worker::EchoWorkerFactory;
//!
//! #[tokio::main]
//! async fn main() -> session_relay::Result<()> {
//!     session_relay::logging::try_init("info").ok();
//!
//!     let broker = Arc::new(Broker::new(
//!         BrokerConfig::default(),
//!         Arc::new(EchoWorkerFactory),
//!     ));
//!     let sweeper = reaper::spawn(
//!         broker.registry(),
//!         std::time::Duration::from_secs(30),
//!         std::time::Duration::from_secs(600),
//!     );
//!
//!     let state = AppState::new(Arc::clone(&broker), 65_536);
//!     api::serve(ServerConfig::default(), state).await?;
//!
//!     sweeper.abort();
//!     broker.shutdown();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod broker;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod session;
pub mod worker;

// Re-export commonly used types
pub use broker::{Broker, BrokerConfig};
pub use config::Config;
pub use error::{RelayError, Result};
pub use message::Message;
pub use session::{Session, SessionId, SessionRegistry};
pub use worker::{EchoWorker, EchoWorkerFactory, Outcome, Worker, WorkerFactory};
