//! Latest-decision snapshot.
//!
//! The current decision is an immutable `Arc<Decision>` behind a single
//! lock. Writers swap the whole pointer; readers clone it out, so a reader
//! always sees one complete decision and never holds the lock while
//! serializing.

use irrig_shared::{Decision, StatusView};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct StateStore {
    current: RwLock<Option<Arc<Decision>>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current decision, or `None` before the first evaluation.
    pub async fn get(&self) -> Option<Arc<Decision>> {
        self.current.read().await.clone()
    }

    /// Replace the snapshot. Last writer wins.
    pub async fn set(&self, decision: Decision) {
        let next = Arc::new(decision);
        *self.current.write().await = Some(next);
    }

    /// Snapshot in `/status` shape.
    pub async fn view(&self) -> StatusView {
        match self.get().await {
            Some(decision) => StatusView::from(decision.as_ref()),
            None => StatusView::unset(),
        }
    }
}

/// Thread-safe shared state handle
pub type SharedState = Arc<StateStore>;
