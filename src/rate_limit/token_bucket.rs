use super::{validate_params, Limiter};
use crate::error::{RateLimitError, Result};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use std::num::NonZeroU32;
use std::time::Duration;

/// Token bucket with capacity `limit`, refilled continuously at
/// `limit / window` tokens per unit of time.
pub struct TokenBucketLimiter {
    limiter: GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    limit: u32,
    window: Duration,
}

impl std::fmt::Debug for TokenBucketLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucketLimiter")
            .field("limit", &self.limit)
            .field("window", &self.window)
            .field("limiter", &"<governor::RateLimiter>")
            .finish()
    }
}

impl TokenBucketLimiter {
    pub fn new(limit: u32, window: Duration) -> Result<Self> {
        validate_params(limit, window)?;
        let burst = NonZeroU32::new(limit)
            .ok_or_else(|| RateLimitError::Config("Rate limit must be > 0".to_string()))?;

        // One token every window / limit
        let quota = Quota::with_period(window / limit)
            .ok_or_else(|| {
                RateLimitError::Config(format!(
                    "Window {:?} is too short to refill {} tokens",
                    window, limit
                ))
            })?
            .allow_burst(burst);

        Ok(Self {
            limiter: GovernorRateLimiter::direct(quota),
            limit,
            window,
        })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Limiter for TokenBucketLimiter {
    fn admit(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
