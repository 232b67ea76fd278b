//! Tiered rate limiting
//!
//! Throttles actions against quotas scoped globally, per caller identity and
//! per endpoint. The [`rate_limit::TieredRateLimiter`] charges each scope
//! against a pluggable [`store::CounterStore`]; the single-scope limiters in
//! [`rate_limit`] work without any store.
//!
//! ```rust,no_run
//! use ratelimiter::config::RateLimiterConfig;
//! use ratelimiter::rate_limit::TieredRateLimiter;
//! use ratelimiter::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> ratelimiter::error::Result<()> {
//!     let config = RateLimiterConfig::from_file("config/ratelimiter.yaml")?;
//!     let limiter = TieredRateLimiter::new(&config, Arc::new(MemoryStore::new()))?;
//!
//!     if !limiter.allow("/api/data", "user123").await {
//!         println!("Rate limit exceeded");
//!     }
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod store;

pub use crate::config::{RateLimiterConfig, ScopeLimit};
pub use crate::error::{RateLimitError, Result};
pub use crate::rate_limit::{new_limiter, Decision, Limiter, LimiterKind, TieredRateLimiter};
pub use crate::store::{CounterStore, MemoryStore, RedisStore};

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ratelimiter=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();
}
