//! Counter storage used by the tiered rate limiter
//!
//! A [`CounterStore`] keeps one expiring counter per key. The tiered limiter
//! only ever asks for a combined increment-and-expire, never for raw state.
//!
//! - [`MemoryStore`]: in-process, volatile, single node
//! - [`RedisStore`]: shared across processes through Redis

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Longest expiry any store will set; longer TTLs are clamped to it
pub(crate) const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Concurrency-safe storage of expiring counters
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `key` and set its expiry to `ttl` from now.
    ///
    /// A key with no live entry starts again at 1. Returns the count after
    /// the increment. The increment and the expiry update must be applied as
    /// one atomic operation.
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<u64>;
}
