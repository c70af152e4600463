use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// One async mutex per session id. The guard must be held across the whole
/// fetch → mutate → persist → publish cycle of a session.
#[derive(Clone, Default)]
pub struct SessionLocks {
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    /// Empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `session_id`. Waiters are served in FIFO order.
    pub async fn acquire(&self, session_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(session_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Forget locks nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no session is tracked.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
