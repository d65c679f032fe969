//! Per-feed run exclusivity
//!
//! An in-process registry of feed ids that currently have a run in flight.
//! Acquisition is try-only; a caller that finds the lock held declines to
//! run instead of waiting. The guard releases on drop, so an aborted or
//! panicked run cannot leave its feed locked.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

#[derive(Clone, Default)]
pub struct FeedLocks {
    held: Arc<Mutex<HashSet<Uuid>>>,
}

impl FeedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim the run lock for a feed. Returns `None` when a run is
    /// already in flight.
    pub fn try_acquire(&self, feed_id: Uuid) -> Option<FeedLockGuard> {
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        if held.insert(feed_id) {
            Some(FeedLockGuard {
                feed_id,
                held: Arc::clone(&self.held),
            })
        } else {
            None
        }
    }

    pub fn is_held(&self, feed_id: Uuid) -> bool {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&feed_id)
    }
}

/// Releases the feed's run lock on drop
pub struct FeedLockGuard {
    feed_id: Uuid,
    held: Arc<Mutex<HashSet<Uuid>>>,
}

impl Drop for FeedLockGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.feed_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let locks = FeedLocks::new();
        let feed_id = Uuid::new_v4();

        let guard = locks.try_acquire(feed_id);
        assert!(guard.is_some());
        assert!(locks.try_acquire(feed_id).is_none());
        assert!(locks.is_held(feed_id));
    }

    #[test]
    fn test_released_on_drop() {
        let locks = FeedLocks::new();
        let feed_id = Uuid::new_v4();

        {
            let _guard = locks.try_acquire(feed_id);
            assert!(locks.is_held(feed_id));
        }
        assert!(!locks.is_held(feed_id));
        assert!(locks.try_acquire(feed_id).is_some());
    }

    #[test]
    fn test_locks_are_independent_per_feed() {
        let locks = FeedLocks::new();
        let _a = locks.try_acquire(Uuid::new_v4());
        assert!(locks.try_acquire(Uuid::new_v4()).is_some());
    }
}
