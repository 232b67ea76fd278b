use super::{CounterStore, MAX_TTL};
use crate::clock::{Clock, MonotonicClock};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct CounterEntry {
    count: u64,
    expires_at: Instant,
}

/// In-memory counter store.
///
/// Each key's read-modify-write runs under its DashMap shard lock, so
/// concurrent increments on the same key never observe the same count.
/// Expired entries are reset lazily on the next increment; call
/// [`purge_expired`](Self::purge_expired) or start a sweeper to reclaim
/// memory for keys that go quiet.
#[derive(Debug)]
pub struct MemoryStore<C: Clock = MonotonicClock> {
    entries: DashMap<String, CounterEntry>,
    clock: C,
}

impl MemoryStore<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock)
    }
}

impl Default for MemoryStore<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C: Clock + 'static> MemoryStore<C> {
    /// Periodically purge expired entries on the current tokio runtime.
    ///
    /// The task holds the store alive; abort the returned handle to stop it.
    pub fn start_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut sweep_interval = interval(every);
            loop {
                sweep_interval.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, remaining = store.len(), "Purged expired counters");
                }
            }
        })
    }
}

#[async_trait]
impl<C: Clock + 'static> CounterStore for MemoryStore<C> {
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<u64> {
        let now = self.clock.now();
        let expires_at = now.checked_add(ttl.min(MAX_TTL)).unwrap_or(now);

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert(CounterEntry {
                count: 0,
                expires_at,
            });

        if entry.expires_at <= now {
            entry.count = 0;
        }
        entry.count += 1;
        entry.expires_at = expires_at;

        Ok(entry.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_increment_creates_and_counts() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);

        tokio_test::block_on(async {
            assert_eq!(store.increment_with_expiry("a", ttl).await.unwrap(), 1);
            assert_eq!(store.increment_with_expiry("a", ttl).await.unwrap(), 2);
            assert_eq!(store.increment_with_expiry("b", ttl).await.unwrap(), 1);
        });
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_restarts_at_one() {
        let clock = ManualClock::new();
        let store = MemoryStore::with_clock(clock.clone());
        let ttl = Duration::from_secs(1);

        store.increment_with_expiry("a", ttl).await.unwrap();
        store.increment_with_expiry("a", ttl).await.unwrap();

        clock.advance(Duration::from_millis(1001));

        assert_eq!(store.increment_with_expiry("a", ttl).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_increment_refreshes_expiry() {
        let clock = ManualClock::new();
        let store = MemoryStore::with_clock(clock.clone());
        let ttl = Duration::from_secs(1);

        store.increment_with_expiry("a", ttl).await.unwrap();
        clock.advance(Duration::from_millis(800));
        store.increment_with_expiry("a", ttl).await.unwrap();
        clock.advance(Duration::from_millis(800));

        // Still live: the second increment pushed the expiry out
        assert_eq!(store.increment_with_expiry("a", ttl).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_huge_ttl_is_clamped() {
        let clock = ManualClock::new();
        let store = MemoryStore::with_clock(clock.clone());
        let ttl = Duration::from_secs(i64::MAX as u64);

        assert_eq!(store.increment_with_expiry("a", ttl).await.unwrap(), 1);
        clock.advance(Duration::from_secs(365 * 24 * 60 * 60));
        assert_eq!(store.increment_with_expiry("a", ttl).await.unwrap(), 2);
        assert_eq!(store.purge_expired(), 0);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let clock = ManualClock::new();
        let store = MemoryStore::with_clock(clock.clone());

        store
            .increment_with_expiry("short", Duration::from_secs(1))
            .await
            .unwrap();
        store
            .increment_with_expiry("long", Duration::from_secs(10))
            .await
            .unwrap();

        clock.advance(Duration::from_secs(2));

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_purges_in_background() {
        let store = Arc::new(MemoryStore::new());
        store
            .increment_with_expiry("a", Duration::from_millis(20))
            .await
            .unwrap();

        let sweeper = store.start_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(80)).await;
        sweeper.abort();

        assert!(store.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_linearizable() {
        let store = Arc::new(MemoryStore::new());

        let tasks: Vec<_> = (0..100)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .increment_with_expiry("shared", Duration::from_secs(60))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut counts = Vec::with_capacity(tasks.len());
        for task in tasks {
            counts.push(task.await.unwrap());
        }
        counts.sort_unstable();

        assert_eq!(counts, (1..=100).collect::<Vec<u64>>());
    }
}
