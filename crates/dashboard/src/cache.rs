//! Response Cache
//!
//! Memoizes successful lookups by argument. Failures are never stored, so a
//! failed call is retried on the next request instead of being replayed.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use tokio::time::{Duration, Instant};
use tracing::debug;

/// Key to value cache with optional time-to-live
pub struct ResponseCache<K, V> {
    /// None keeps entries for the process lifetime
    ttl: Option<Duration>,
    entries: HashMap<K, (Instant, V)>,
}

impl<K, V> ResponseCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    /// Create an empty cache
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    fn is_fresh(&self, stored_at: Instant) -> bool {
        self.ttl.map_or(true, |ttl| stored_at.elapsed() < ttl)
    }

    /// Get a value if present and still valid
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .filter(|(stored_at, _)| self.is_fresh(*stored_at))
            .map(|(_, value)| value.clone())
    }

    /// Store a value, restarting its validity window
    fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }

    /// Return the cached value or run `fetch`, caching only on success
    pub async fn get_or_fetch<F, Fut, E>(&mut self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            debug!("Cache hit for {:?}", key);
            return Ok(value);
        }

        debug!("Cache miss for {:?} ({} entries stored)", key, self.len());
        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Number of stored entries, including expired ones
    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn counted(calls: &AtomicUsize, result: Result<u32, &'static str>) -> Result<u32, &'static str> {
        calls.fetch_add(1, Ordering::SeqCst);
        result
    }

    #[tokio::test]
    async fn test_second_fetch_is_cached() {
        let calls = AtomicUsize::new(0);
        let mut cache = ResponseCache::new(None);

        let first = cache.get_or_fetch(1, || counted(&calls, Ok(7))).await;
        let second = cache.get_or_fetch(1, || counted(&calls, Ok(8))).await;

        assert_eq!(first, Ok(7));
        assert_eq!(second, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let calls = AtomicUsize::new(0);
        let mut cache = ResponseCache::new(None);

        let first = cache.get_or_fetch("a", || counted(&calls, Err("down"))).await;
        let second = cache.get_or_fetch("a", || counted(&calls, Ok(3))).await;

        assert_eq!(first, Err("down"));
        assert_eq!(second, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let calls = AtomicUsize::new(0);
        let mut cache = ResponseCache::new(None);

        cache.get_or_fetch(1, || counted(&calls, Ok(1))).await.unwrap();
        cache.get_or_fetch(2, || counted(&calls, Ok(2))).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get(&2), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_refetches() {
        let calls = AtomicUsize::new(0);
        let mut cache = ResponseCache::new(Some(Duration::from_secs(60)));

        cache.get_or_fetch(1, || counted(&calls, Ok(1))).await.unwrap();
        tokio::time::advance(Duration::from_secs(59)).await;
        cache.get_or_fetch(1, || counted(&calls, Ok(2))).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        let value = cache.get_or_fetch(1, || counted(&calls, Ok(3))).await.unwrap();
        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_replaced_in_place() {
        let calls = AtomicUsize::new(0);
        let mut cache = ResponseCache::new(Some(Duration::from_secs(1)));

        cache.get_or_fetch("k", || counted(&calls, Ok(1))).await.unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(&"k").is_none());
        assert_eq!(cache.len(), 1);

        cache.get_or_fetch("k", || counted(&calls, Ok(2))).await.unwrap();
        assert_eq!(cache.get(&"k"), Some(2));
        assert_eq!(cache.len(), 1);
    }
}
