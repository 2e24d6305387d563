// ── Poll scheduler ──
//
// One task per entity, each on its own interval. The first poll runs
// immediately. Cancelling the shared token stops every task; a refresh that
// is cut short is dropped before it publishes anything.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::entity::Entity;

/// Running poll tasks for a set of entities.
pub struct PollScheduler {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl PollScheduler {
    /// Spawn a poll task per entity. Must be called inside a tokio runtime.
    pub fn start(entities: &[Entity], interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let handles = entities
            .iter()
            .cloned()
            .map(|entity| tokio::spawn(poll_task(entity, interval, cancel.clone())))
            .collect();
        Self { cancel, handles }
    }

    /// Token that stops every poll task when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop polling and wait for every task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            let _ = handle.await;
        }
        debug!("poll scheduler stopped");
    }
}

async fn poll_task(entity: Entity, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = entity.refresh() => {}
                }
            }
        }
    }
    debug!(entity = %entity.unique_id(), "poll task stopped");
}
