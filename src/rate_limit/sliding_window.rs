use super::{validate_params, Limiter};
use crate::clock::{Clock, MonotonicClock};
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Upper bound on the log's initial reservation; it grows on demand up to `limit`
const INITIAL_CAPACITY: u32 = 1024;

/// Sliding window log.
///
/// Keeps the timestamps of admitted calls in insertion order. A call is
/// admitted while fewer than `limit` timestamps fall inside `(now - window, now]`.
/// Denied calls are not recorded.
#[derive(Debug)]
pub struct SlidingWindowLimiter<C: Clock = MonotonicClock> {
    limit: u32,
    window: Duration,
    requests: Mutex<VecDeque<Instant>>,
    clock: C,
}

impl SlidingWindowLimiter<MonotonicClock> {
    pub fn new(limit: u32, window: Duration) -> Result<Self> {
        Self::with_clock(limit, window, MonotonicClock)
    }
}

impl<C: Clock> SlidingWindowLimiter<C> {
    /// Create a limiter reading time from `clock`
    pub fn with_clock(limit: u32, window: Duration, clock: C) -> Result<Self> {
        validate_params(limit, window)?;
        Ok(Self {
            limit,
            window,
            requests: Mutex::new(VecDeque::with_capacity(limit.min(INITIAL_CAPACITY) as usize)),
            clock,
        })
    }

    /// Admissions currently recorded, including ones that would be evicted by
    /// the next call
    pub fn occupancy(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl<C: Clock> Limiter for SlidingWindowLimiter<C> {
    fn admit(&self) -> bool {
        let now = self.clock.now();

        let mut requests = self.requests.lock();

        // Timestamps are non-decreasing, so expired ones sit at the front
        if let Some(cutoff) = now.checked_sub(self.window) {
            while let Some(&oldest) = requests.front() {
                if oldest > cutoff {
                    break;
                }
                requests.pop_front();
            }
        }

        if requests.len() < self.limit as usize {
            requests.push_back(now);
            true
        } else {
            false
        }
    }
}
