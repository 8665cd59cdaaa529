use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct Slot {
    generation: u64,
    pending: Option<AbortHandle>,
}

/// Delays a search and cancels it when a newer one is submitted.
/// Only the most recent submission yields a result.
pub struct SearchDebouncer {
    delay: Duration,
    slot: Mutex<Slot>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Runs `search` after the debounce delay. Returns `None` if a later
    /// call superseded this one before it finished.
    pub async fn run<F, T>(&self, search: F) -> Option<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let delay = self.delay;
        let (generation, handle) = {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = slot.pending.take() {
                previous.abort();
            }
            slot.generation += 1;
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                search.await
            });
            slot.pending = Some(handle.abort_handle());
            (slot.generation, handle)
        };

        let outcome = handle.await;
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.generation != generation {
            debug!(generation, latest = slot.generation, "search superseded");
            return None;
        }
        slot.pending = None;
        outcome.ok()
    }
}

/// One debouncer per user with a search in flight. The map only holds weak
/// handles; once a user's last search finishes the entry is pruned.
pub struct SearchDebouncers {
    delay: Duration,
    by_user: Mutex<HashMap<Uuid, Weak<SearchDebouncer>>>,
}

impl SearchDebouncers {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            by_user: Mutex::new(HashMap::new()),
        }
    }

    pub fn for_user(&self, user_id: Uuid) -> Arc<SearchDebouncer> {
        let mut map = self.by_user.lock().unwrap_or_else(|e| e.into_inner());
        map.retain(|_, d| d.strong_count() > 0);
        if let Some(existing) = map.get(&user_id).and_then(Weak::upgrade) {
            return existing;
        }
        let debouncer = Arc::new(SearchDebouncer::new(self.delay));
        map.insert(user_id, Arc::downgrade(&debouncer));
        debouncer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn single_search_completes() {
        let d = SearchDebouncer::new(Duration::from_millis(5));
        assert_eq!(d.run(async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn newer_query_cancels_older_one() {
        let d = Arc::new(SearchDebouncer::new(Duration::from_millis(80)));

        let first = {
            let d = d.clone();
            tokio::spawn(async move { d.run(async { "app" }).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = d.run(async { "apple" }).await;

        assert_eq!(first.await.unwrap(), None);
        assert_eq!(second, Some("apple"));
    }

    #[tokio::test]
    async fn sequential_queries_each_complete() {
        let d = SearchDebouncer::new(Duration::from_millis(1));
        assert_eq!(d.run(async { 1 }).await, Some(1));
        assert_eq!(d.run(async { 2 }).await, Some(2));
    }

    #[tokio::test]
    async fn idle_users_are_pruned() {
        let reg = SearchDebouncers::new(Duration::from_millis(1));
        let held: Vec<_> = (0..3).map(|_| reg.for_user(Uuid::new_v4())).collect();
        for d in &held {
            assert_eq!(d.run(async { 1 }).await, Some(1));
        }
        assert_eq!(reg.by_user.lock().unwrap().len(), 3);
        drop(held);

        let _active = reg.for_user(Uuid::new_v4());
        assert_eq!(reg.by_user.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_searches_share_one_debouncer() {
        let reg = SearchDebouncers::new(Duration::from_millis(80));
        let user = Uuid::new_v4();

        let first = {
            let d = reg.for_user(user);
            tokio::spawn(async move { d.run(async { "app" }).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = reg.for_user(user).run(async { "apple" }).await;

        assert_eq!(first.await.unwrap(), None);
        assert_eq!(second, Some("apple"));
    }

    #[test]
    fn debouncers_are_shared_per_user() {
        let reg = SearchDebouncers::new(Duration::from_millis(1));
        let user = Uuid::new_v4();
        assert!(Arc::ptr_eq(&reg.for_user(user), &reg.for_user(user)));
        assert!(!Arc::ptr_eq(&reg.for_user(user), &reg.for_user(Uuid::new_v4())));
    }
}
