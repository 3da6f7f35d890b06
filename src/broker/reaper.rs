//! Periodic reclamation of idle sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::session::SessionRegistry;

/// Spawn the reaper task.
///
/// Every `interval` it removes sessions idle longer than `max_idle`. Removal
/// only makes a session unreachable for future lookups; the reaper never
/// touches a session's mailboxes. A worker still blocked on its inbox exits
/// on its own, either through the closed channel or its own give-up timeout.
pub fn spawn(
    registry: Arc<SessionRegistry>,
    interval: Duration,
    max_idle: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately.
        tick.tick().await;

        loop {
            tick.tick().await;
            match registry.sweep(max_idle) {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "reaped idle sessions"),
                Err(err) => warn!(%err, "session sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reaper_removes_only_stale() {
        let registry = Arc::new(SessionRegistry::new());

        let (stale, _w1) = registry.create();
        let stale_id = stale.id;
        stale.backdate(Duration::from_millis(500));
        registry.insert(stale).unwrap();

        let (fresh, _w2) = registry.create();
        let fresh_id = fresh.id;
        registry.insert(fresh).unwrap();

        let reaper = spawn(
            Arc::clone(&registry),
            Duration::from_millis(10),
            Duration::from_millis(200),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        reaper.abort();

        assert!(registry.lookup(&stale_id).is_err());
        assert!(registry.lookup(&fresh_id).is_ok());
    }

    #[tokio::test]
    async fn test_reaper_idles_on_empty_registry() {
        let registry = Arc::new(SessionRegistry::new());
        let reaper = spawn(
            Arc::clone(&registry),
            Duration::from_millis(10),
            Duration::from_millis(10),
        );

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(!reaper.is_finished());
        reaper.abort();
    }
}
