//! Per-conversation turn locks.
//!
//! Two concurrent turns on one conversation would interleave their
//! user/tool/assistant triples in the log. The lock map serializes turns
//! per conversation while leaving different conversations fully parallel.
//!
//! The outer `std::sync::Mutex` is held only to clone an `Arc` out of the
//! map, never across an await point.

use std::collections::HashMap;
use std::sync::Arc;

use taskling_core::conversation::ConversationId;

const EVICTION_THRESHOLD: usize = 10_000;

/// A map of per-conversation async locks.
#[derive(Default)]
pub struct TurnLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding turns on `id`. Hold the guard for the whole turn.
    ///
    /// When the map grows past the threshold, entries nobody currently
    /// holds are evicted; a lock that is in use survives because its `Arc`
    /// is shared with the holder.
    pub fn for_conversation(&self, id: &ConversationId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());

        if locks.len() > EVICTION_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        locks.entry(id.as_str().to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_conversation_shares_one_lock() {
        let locks = TurnLocks::new();
        let id = ConversationId::from("c1");
        let a = locks.for_conversation(&id);
        let b = locks.for_conversation(&id);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_conversations_get_independent_locks() {
        let locks = TurnLocks::new();
        let a = locks.for_conversation(&ConversationId::from("c1"));
        let b = locks.for_conversation(&ConversationId::from("c2"));
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn lock_serializes_turns() {
        let locks = Arc::new(TurnLocks::new());
        let id = ConversationId::from("c1");
        let counter = Arc::new(std::sync::atomic::AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let id = id.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let lock = locks.for_conversation(&id);
                let _guard = lock.lock().await;
                // No other task may observe an odd value from outside
                // its own critical section.
                let v = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                tokio::task::yield_now().await;
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                assert_eq!(v % 2, 0);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 16);
    }

    #[test]
    fn eviction_keeps_locks_that_are_held() {
        let locks = TurnLocks::new();
        let held = locks.for_conversation(&ConversationId::from("held"));

        for i in 0..=EVICTION_THRESHOLD {
            locks.for_conversation(&ConversationId::from(&format!("c{i}")));
        }

        // The held lock survived eviction; re-requesting it yields the same Arc.
        let again = locks.for_conversation(&ConversationId::from("held"));
        assert!(Arc::ptr_eq(&held, &again));
    }
}
