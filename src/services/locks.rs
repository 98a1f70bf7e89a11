use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per trip. Every mutation under a trip's subtree holds its
/// trip's guard, so cascades never interleave with writes to the same tree.
#[derive(Clone, Default)]
pub struct TripLocks {
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl TripLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, trip_id: i64) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(trip_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Drops the entry for a trip that no longer exists.
    pub fn forget(&self, trip_id: i64) {
        self.locks.remove(&trip_id);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_trip_is_serialized() {
        let locks = TripLocks::new();
        let guard = locks.acquire(1).await;
        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.acquire(1).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());
        drop(guard);
        waiting.await.unwrap();
    }

    #[tokio::test]
    async fn different_trips_do_not_block_each_other() {
        let locks = TripLocks::new();
        let _first = locks.acquire(1).await;
        let _second = locks.acquire(2).await;
        assert_eq!(locks.locks.len(), 2);
        locks.forget(1);
        assert_eq!(locks.locks.len(), 1);
    }
}
