//! Worker tasks.
//!
//! A worker is the long-lived unit performing the actual domain work behind
//! a session. It never talks to the transport; it only exchanges messages
//! through its mailbox pair, which keeps worker implementations entirely
//! decoupled from the relay.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::message::{Message, CLIENT_FIELD, CLIENT_ID_FIELD, CMD_FIELD, SESSION_FIELD};
use crate::session::WorkerHalf;

/// What a worker produced for one inbound message.
#[derive(Debug)]
pub enum Outcome {
    /// Send this reply and await the next inbound message.
    Reply(Message),
    /// Send this reply, then terminate.
    Final(Message),
}

/// Domain logic behind a session, opaque to the relay core.
pub trait Worker: Send {
    /// Perform bounded domain work for one inbound message.
    fn process(&mut self, msg: Message) -> Outcome;
}

/// Constructs a fresh worker for each new session.
pub trait WorkerFactory: Send + Sync {
    /// Build a worker, or fail without any session becoming registered.
    fn create(&self) -> Result<Box<dyn Worker>>;
}

/// Drive a worker until it terminates.
///
/// The loop awaits the inbox, runs the worker on each message, and places
/// the reply in the outbound slot. It exits when:
/// - the stop control message arrives (no domain work is performed for it),
/// - the inbox closes (its session was dropped),
/// - nothing arrives within `idle_timeout` — an orphaned worker must give up
///   on its own; the reaper never touches mailboxes,
/// - placing a reply fails. An occupied reply slot means the single-writer
///   discipline was broken somewhere; retrying would queue a second
///   outstanding exchange, so the worker terminates instead.
pub async fn run(mut worker: Box<dyn Worker>, half: WorkerHalf, idle_timeout: Duration) {
    let WorkerHalf { mut inbox, replies } = half;

    loop {
        let msg = match tokio::time::timeout(idle_timeout, inbox.recv()).await {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                debug!("inbox closed, worker exiting");
                break;
            }
            Err(_) => {
                debug!(?idle_timeout, "worker idle give-up");
                break;
            }
        };

        if msg.is_stop() {
            debug!("stop command received, worker exiting");
            break;
        }

        match worker.process(msg) {
            Outcome::Reply(reply) => {
                if replies.try_send(reply).is_err() {
                    warn!("reply slot unavailable, worker exiting");
                    break;
                }
            }
            Outcome::Final(reply) => {
                let _ = replies.try_send(reply);
                break;
            }
        }
    }
}

/// Demonstration worker: acknowledges every message and echoes its payload.
///
/// Broker-reserved fields (`session`, `cmd`, and the injected caller
/// annotations) are stripped from the echo.
#[derive(Debug, Default)]
pub struct EchoWorker;

impl Worker for EchoWorker {
    fn process(&mut self, msg: Message) -> Outcome {
        let mut reply = Message::new();
        reply.insert("ok", Value::Bool(true));
        for (key, value) in msg.iter() {
            if !matches!(
                key.as_str(),
                SESSION_FIELD | CMD_FIELD | CLIENT_FIELD | CLIENT_ID_FIELD
            ) {
                reply.insert(key.clone(), value.clone());
            }
        }
        Outcome::Reply(reply)
    }
}

/// Factory for [`EchoWorker`].
#[derive(Debug, Default)]
pub struct EchoWorkerFactory;

impl WorkerFactory for EchoWorkerFactory {
    fn create(&self) -> Result<Box<dyn Worker>> {
        Ok(Box::new(EchoWorker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mailbox_pair;

    const IDLE: Duration = Duration::from_secs(5);
    const WAIT: Duration = Duration::from_millis(200);

    #[tokio::test]
    async fn test_echo_reply() {
        let (front, half) = mailbox_pair();
        tokio::spawn(run(Box::new(EchoWorker), half, IDLE));

        let mut msg = Message::new();
        msg.insert("ack", 1.into());
        msg.annotate("127.0.0.1", Some("tester"));
        front.offer(msg).unwrap();

        let reply = front.poll(WAIT).await.unwrap();
        assert_eq!(reply.get("ok"), Some(&Value::Bool(true)));
        assert_eq!(reply.get("ack"), Some(&Value::from(1)));
        assert!(reply.get(CLIENT_FIELD).is_none());
        assert!(reply.get(CLIENT_ID_FIELD).is_none());
    }

    #[tokio::test]
    async fn test_stop_terminates_without_domain_work() {
        let (front, half) = mailbox_pair();
        let task = tokio::spawn(run(Box::new(EchoWorker), half, IDLE));

        front.offer(Message::stop()).unwrap();
        tokio::time::timeout(WAIT, task).await.unwrap().unwrap();

        // No reply was produced for the stop message.
        assert!(front.poll(Duration::from_millis(10)).await.is_err());
    }

    #[tokio::test]
    async fn test_idle_give_up() {
        let (front, half) = mailbox_pair();
        let task = tokio::spawn(run(Box::new(EchoWorker), half, Duration::from_millis(20)));

        tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
        assert!(front.offer(Message::new()).is_err());
    }

    #[tokio::test]
    async fn test_inbox_close_exits() {
        let (front, half) = mailbox_pair();
        let task = tokio::spawn(run(Box::new(EchoWorker), half, IDLE));

        drop(front);
        tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
    }

    struct OneShot;

    impl Worker for OneShot {
        fn process(&mut self, _msg: Message) -> Outcome {
            let mut reply = Message::new();
            reply.insert("done", Value::Bool(true));
            Outcome::Final(reply)
        }
    }

    #[tokio::test]
    async fn test_final_outcome_replies_then_exits() {
        let (front, half) = mailbox_pair();
        let task = tokio::spawn(run(Box::new(OneShot), half, IDLE));

        front.offer(Message::new()).unwrap();
        let reply = front.poll(WAIT).await.unwrap();
        assert_eq!(reply.get("done"), Some(&Value::Bool(true)));

        tokio::time::timeout(WAIT, task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_occupied_reply_slot_is_fatal() {
        let (front, half) = mailbox_pair();
        let task = tokio::spawn(run(Box::new(EchoWorker), half, IDLE));

        // First reply fills the slot; nobody polls it away.
        front.offer(Message::new()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Second message processes, but its reply cannot be placed.
        front.offer(Message::new()).unwrap();
        tokio::time::timeout(WAIT, task).await.unwrap().unwrap();

        // Only the first reply ever made it out.
        assert!(front.poll(WAIT).await.is_ok());
        assert!(front.poll(Duration::from_millis(10)).await.is_err());
    }
}
