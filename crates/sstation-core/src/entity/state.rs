// ── Published entity state ──
//
// Every entity keeps its latest state in a `watch` channel. Writers replace
// the whole value in one non-suspending call, so readers observe either the
// previous state or the next one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

/// What an entity last observed, and whether that observation is current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityState<T> {
    /// Last successful snapshot. Kept across failed polls.
    pub snapshot: Option<T>,
    /// `false` until the first successful poll and after any failed one.
    pub available: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl<T> Default for EntityState<T> {
    fn default() -> Self {
        Self {
            snapshot: None,
            available: false,
            last_updated: None,
        }
    }
}

pub(crate) struct StateCell<T> {
    tx: watch::Sender<EntityState<T>>,
}

impl<T: Clone> StateCell<T> {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(EntityState::default());
        Self { tx }
    }

    pub(crate) fn current(&self) -> EntityState<T> {
        self.tx.borrow().clone()
    }

    pub(crate) fn available(&self) -> bool {
        self.tx.borrow().available
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<EntityState<T>> {
        self.tx.subscribe()
    }

    /// Replace the snapshot after a successful poll.
    pub(crate) fn publish(&self, snapshot: T) {
        self.tx.send_replace(EntityState {
            snapshot: Some(snapshot),
            available: true,
            last_updated: Some(Utc::now()),
        });
    }

    /// Keep the last snapshot but flag it as stale.
    pub(crate) fn mark_unavailable(&self) {
        self.tx.send_if_modified(|state| {
            let changed = state.available;
            state.available = false;
            changed
        });
    }
}
