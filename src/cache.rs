//! Keyed TTL cache with an injectable clock.
//!
//! Each slot holds the last successfully fetched value and when it was fetched.
//! A stale or empty slot is refreshed by running the caller's fetch future.
//!
//! Concurrent stale hits on the same key are not de-duplicated: the lock is
//! only held for map access, never across a fetch, so every caller that sees a
//! stale slot runs its own fetch. Writes race benignly (each is a complete
//! value/timestamp pair); a write older than the stored timestamp is dropped so
//! timestamps never move backwards.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;

/// Source of "now" for freshness decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[derive(Debug)]
pub struct CacheEntry<V> {
    pub value: Arc<V>,
    pub fetched_at: DateTime<Utc>,
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            fetched_at: self.fetched_at,
        }
    }
}

impl<V> CacheEntry<V> {
    /// A negative age (clock stepped back) counts as fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match (now - self.fetched_at).to_std() {
            Ok(age) => age < ttl,
            Err(_) => true,
        }
    }
}

pub struct TtlCache<K, V> {
    slots: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Copy + std::fmt::Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored value when `now - fetched_at < ttl`; otherwise runs
    /// `fetch`, stores its result stamped with `now` and returns it.
    ///
    /// A failed fetch leaves the slot exactly as it was and hands the error back.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: K,
        now: DateTime<Utc>,
        ttl: Duration,
        fetch: F,
    ) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(entry) = self.slots.read().await.get(&key) {
            if entry.is_fresh(now, ttl) {
                tracing::debug!(
                    "Using cached {} (age: {}s)",
                    key,
                    (now - entry.fetched_at).num_seconds()
                );
                return Ok(Arc::clone(&entry.value));
            }
        }

        let value = Arc::new(fetch().await?);

        let mut slots = self.slots.write().await;
        match slots.get(&key) {
            Some(existing) if existing.fetched_at > now => {
                tracing::debug!("Dropping older write for {}; a newer value is stored", key);
            }
            _ => {
                slots.insert(
                    key,
                    CacheEntry {
                        value: Arc::clone(&value),
                        fetched_at: now,
                    },
                );
            }
        }

        Ok(value)
    }

    pub async fn entry(&self, key: K) -> Option<CacheEntry<V>> {
        self.slots.read().await.get(&key).cloned()
    }

    pub async fn fetched_at(&self, key: K) -> Option<DateTime<Utc>> {
        self.entry(key).await.map(|e| e.fetched_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Key {
        A,
        B,
    }

    impl std::fmt::Display for Key {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    const TTL: Duration = Duration::from_secs(300);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    async fn counted(
        cache: &TtlCache<Key, String>,
        key: Key,
        now: DateTime<Utc>,
        calls: &AtomicUsize,
        value: &str,
    ) -> Result<Arc<String>, String> {
        cache
            .get_or_fetch(key, now, TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(value.to_string())
            })
            .await
    }

    #[tokio::test]
    async fn test_fresh_hit_skips_fetch_and_returns_same_value() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);

        let first = counted(&cache, Key::A, t0(), &calls, "first").await.unwrap();
        let second = counted(&cache, Key::A, t0() + secs(299), &calls, "second")
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*second, "first");
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);

        counted(&cache, Key::A, t0(), &calls, "first").await.unwrap();
        let refreshed = counted(&cache, Key::A, t0() + secs(300), &calls, "second")
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*refreshed, "second");
        assert_eq!(cache.fetched_at(Key::A).await, Some(t0() + secs(300)));
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);

        counted(&cache, Key::A, t0(), &calls, "a").await.unwrap();
        let b = counted(&cache, Key::B, t0() + secs(1), &calls, "b").await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*b, "b");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_entry() {
        let cache: TtlCache<Key, String> = TtlCache::new();
        let calls = AtomicUsize::new(0);
        counted(&cache, Key::A, t0(), &calls, "good").await.unwrap();

        let err = cache
            .get_or_fetch(Key::A, t0() + secs(400), TTL, || async {
                Err::<String, _>("upstream down".to_string())
            })
            .await
            .unwrap_err();
        assert_eq!(err, "upstream down");

        let entry = cache.entry(Key::A).await.unwrap();
        assert_eq!(*entry.value, "good");
        assert_eq!(entry.fetched_at, t0());

        // Nothing backs off; the next call retries straight away.
        let retried = counted(&cache, Key::A, t0() + secs(401), &calls, "recovered")
            .await
            .unwrap();
        assert_eq!(*retried, "recovered");
    }

    #[tokio::test]
    async fn test_failed_first_fetch_leaves_slot_absent() {
        let cache: TtlCache<Key, String> = TtlCache::new();
        let result = cache
            .get_or_fetch(Key::A, t0(), TTL, || async { Err::<String, _>("boom") })
            .await;

        assert!(result.is_err());
        assert!(cache.entry(Key::A).await.is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_always_fetches() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            cache
                .get_or_fetch(Key::A, t0(), Duration::ZERO, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(1)
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_older_write_does_not_move_timestamp_back() {
        let cache: TtlCache<Key, String> = TtlCache::new();
        let (started_tx, started_rx) = tokio::sync::oneshot::channel::<()>();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        // Fetch stamped t0 parks until a fetch stamped t0+60 has been stored.
        let slow = cache.get_or_fetch(Key::A, t0(), TTL, || async move {
            let _ = started_tx.send(());
            let _ = release_rx.await;
            Ok::<_, ()>("older".to_string())
        });
        let fast = async {
            let _ = started_rx.await;
            let newer = cache
                .get_or_fetch(Key::A, t0() + secs(60), TTL, || async {
                    Ok::<_, ()>("newer".to_string())
                })
                .await;
            let _ = release_tx.send(());
            newer
        };

        let (older, newer) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(slow, fast)
        })
        .await
        .expect("fetches did not interleave");

        assert_eq!(*older.unwrap(), "older");
        assert_eq!(*newer.unwrap(), "newer");
        let entry = cache.entry(Key::A).await.unwrap();
        assert_eq!(*entry.value, "newer");
        assert_eq!(entry.fetched_at, t0() + secs(60));
    }

    #[tokio::test]
    async fn test_concurrent_stale_hits_each_fetch() {
        let cache: TtlCache<Key, usize> = TtlCache::new();
        let calls = AtomicUsize::new(0);
        // Both fetches must be in flight at once to pass the barrier, which
        // only happens when the cache lets them run side by side.
        let barrier = Barrier::new(2);

        let fetch = |n: usize| {
            let calls = &calls;
            let barrier = &barrier;
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                barrier.wait().await;
                Ok::<_, ()>(n)
            }
        };

        let both = async {
            tokio::join!(
                cache.get_or_fetch(Key::A, t0(), TTL, fetch(1)),
                cache.get_or_fetch(Key::A, t0(), TTL, fetch(2)),
            )
        };
        let (a, b) = tokio::time::timeout(Duration::from_secs(5), both)
            .await
            .expect("fetches were serialized");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*a.unwrap(), 1);
        assert_eq!(*b.unwrap(), 2);
        assert!(cache.entry(Key::A).await.is_some());
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(t0());
        clock.advance(secs(90));
        assert_eq!(clock.now(), t0() + secs(90));
        clock.set(t0());
        assert_eq!(clock.now(), t0());
    }
}
