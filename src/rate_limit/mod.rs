//! Rate limiting module
//!
//! This module provides in-process single-scope limiters and a tiered limiter
//! that evaluates several scopes against a shared [`CounterStore`]:
//!
//! - **Fixed Window**: one counter, zeroed by a background timer every window
//! - **Sliding Window**: exact timestamps of recent admissions
//! - **Token Bucket**: continuous refill, backed by `governor`
//! - **Tiered**: global, per-user and per-endpoint scopes over a counter store
//!
//! # Example
//!
//! ```rust,no_run
//! use ratelimiter::rate_limit::{new_limiter, LimiterKind};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let limiter = new_limiter(LimiterKind::SlidingWindow, 100, Duration::from_secs(60))
//!         .expect("valid limiter parameters");
//!
//!     if !limiter.admit() {
//!         println!("Rate limit exceeded");
//!     }
//! }
//! ```
//!
//! [`CounterStore`]: crate::store::CounterStore

pub mod fixed_window;
pub mod sliding_window;
pub mod tiered;
pub mod token_bucket;

pub use fixed_window::FixedWindowLimiter;
pub use sliding_window::SlidingWindowLimiter;
pub use tiered::{Decision, Scope, TieredRateLimiter, TieredRateLimiterBuilder};
pub use token_bucket::TokenBucketLimiter;

use crate::error::{RateLimitError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A single-scope, in-process rate limiter
pub trait Limiter: Send + Sync {
    /// Decide whether one more action may proceed now
    fn admit(&self) -> bool;
}

/// Rate limiting strategy.
///
/// Unrecognized selectors, whether strings, integer codes or serialized
/// values, resolve to [`LimiterKind::TokenBucket`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimiterKind {
    /// Counter reset on a periodic boundary
    FixedWindow,
    /// Exact admission timestamps over a trailing window
    SlidingWindow,
    /// Continuous-refill token bucket
    #[default]
    #[serde(other)]
    TokenBucket,
}

impl From<&str> for LimiterKind {
    fn from(selector: &str) -> Self {
        match selector.trim().to_ascii_lowercase().as_str() {
            "fixed_window" | "fixed-window" | "fixed" => LimiterKind::FixedWindow,
            "sliding_window" | "sliding-window" | "sliding" => LimiterKind::SlidingWindow,
            "token_bucket" | "token-bucket" | "token" => LimiterKind::TokenBucket,
            other => {
                debug!(selector = %other, "Unknown limiter selector, using token bucket");
                LimiterKind::TokenBucket
            }
        }
    }
}

impl From<i32> for LimiterKind {
    fn from(code: i32) -> Self {
        match code {
            0 => LimiterKind::FixedWindow,
            1 => LimiterKind::SlidingWindow,
            2 => LimiterKind::TokenBucket,
            other => {
                debug!(code = other, "Unknown limiter code, using token bucket");
                LimiterKind::TokenBucket
            }
        }
    }
}

/// Build a limiter of the requested kind.
///
/// Fixed window limiters spawn their reset task on the current tokio runtime.
pub fn new_limiter(kind: LimiterKind, limit: u32, window: Duration) -> Result<Box<dyn Limiter>> {
    let limiter: Box<dyn Limiter> = match kind {
        LimiterKind::FixedWindow => Box::new(FixedWindowLimiter::new(limit, window)?),
        LimiterKind::SlidingWindow => Box::new(SlidingWindowLimiter::new(limit, window)?),
        LimiterKind::TokenBucket => Box::new(TokenBucketLimiter::new(limit, window)?),
    };
    Ok(limiter)
}

/// Reject parameters no limiter can honor
pub(crate) fn validate_params(limit: u32, window: Duration) -> Result<()> {
    if limit == 0 {
        return Err(RateLimitError::Config(
            "Rate limit must be > 0".to_string(),
        ));
    }
    if window.is_zero() {
        return Err(RateLimitError::Config(
            "Rate limit window must be > 0".to_string(),
        ));
    }
    Ok(())
}
