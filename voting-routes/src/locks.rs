use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use voting_core::model::TopicId;

/// One async mutex per topic, shared by every operation that reads a topic and then writes
/// based on what it read.
///
/// Only serialises work inside this process. Other processes writing to the same storage are
/// not seen.
#[derive(Debug, Clone, Default)]
pub struct TopicLocks {
    locks: Arc<Mutex<HashMap<TopicId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl TopicLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, topic_id: TopicId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // an entry only the map refers to has no holder and no waiter
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(topic_id).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
