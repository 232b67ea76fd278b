use super::{CounterStore, MAX_TTL};
use crate::error::Result;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::{debug, info};

/// Redis-backed counter store.
///
/// `INCR` and `PEXPIRE` are sent in a single `MULTI`/`EXEC` pipeline so the
/// count and its expiry always change together.
#[derive(Clone)]
pub struct RedisStore {
    /// Redis connection manager
    connection: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("connection", &"<redis::aio::ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    /// Connect to Redis, e.g. `redis://127.0.0.1:6379`
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;
        info!("Connected counter store to Redis");
        Ok(Self { connection })
    }

    /// Use an existing connection manager
    pub fn from_connection(connection: ConnectionManager) -> Self {
        Self { connection }
    }

    /// Test Redis connection
    pub async fn ping(&self) -> Result<()> {
        let mut connection = self.connection.clone();
        let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        Ok(())
    }
}

/// Expiry in whole milliseconds, between 1 ms and [`MAX_TTL`].
/// `PEXPIRE 0` would delete the key outright, and Redis rejects expiries that
/// overflow once added to the current time.
fn ttl_millis(ttl: Duration) -> i64 {
    ttl.min(MAX_TTL).as_millis().max(1) as i64
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn increment_with_expiry(&self, key: &str, ttl: Duration) -> Result<u64> {
        let mut connection = self.connection.clone();

        let (count,): (u64,) = redis::pipe()
            .atomic()
            .incr(key, 1u64)
            .pexpire(key, ttl_millis(ttl))
            .ignore()
            .query_async(&mut connection)
            .await?;

        debug!(key = %key, count, "Incremented Redis counter");
        Ok(count)
    }
}
