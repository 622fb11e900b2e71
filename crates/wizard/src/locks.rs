use std::{collections::HashMap, sync::Arc};

use shared::domain::SessionId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async lock per session. Holders of different sessions never wait on each other.
#[derive(Default)]
pub struct SessionLocks {
    slots: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, session: &SessionId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            // A slot only referenced by the map has no holder and no waiter.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(*session).or_default().clone()
        };
        slot.lock_owned().await
    }

    pub async fn tracked_sessions(&self) -> usize {
        self.slots.lock().await.len()
    }
}

#[cfg(test)]
#[path = "tests/locks_tests.rs"]
mod tests;
