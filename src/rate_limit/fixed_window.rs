use super::{validate_params, Limiter};
use crate::error::{RateLimitError, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Fixed window counter.
///
/// A background task zeroes the counter every `window`. Denied calls still
/// increment the counter, so they keep counting against the window until the
/// next reset.
pub struct FixedWindowLimiter {
    count: Arc<AtomicU64>,
    limit: u32,
    window: Duration,
    reset_task: JoinHandle<()>,
    stopped: AtomicBool,
}

impl std::fmt::Debug for FixedWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowLimiter")
            .field("count", &self.count.load(Ordering::Relaxed))
            .field("limit", &self.limit)
            .field("window", &self.window)
            .field("stopped", &self.stopped.load(Ordering::Relaxed))
            .finish()
    }
}

impl FixedWindowLimiter {
    /// Create a limiter and start its reset task on the current tokio runtime
    pub fn new(limit: u32, window: Duration) -> Result<Self> {
        validate_params(limit, window)?;
        let handle = Handle::try_current().map_err(|e| {
            RateLimitError::Runtime(format!(
                "fixed window limiter needs a tokio runtime for its reset task: {}",
                e
            ))
        })?;

        let count = Arc::new(AtomicU64::new(0));
        let reset_task = handle.spawn(Self::reset_loop(count.clone(), window));

        info!(limit, window = ?window, "Started fixed window reset task");

        Ok(Self {
            count,
            limit,
            window,
            reset_task,
            stopped: AtomicBool::new(false),
        })
    }

    async fn reset_loop(count: Arc<AtomicU64>, window: Duration) {
        // First reset one full window after construction
        let mut ticker = interval_at(Instant::now() + window, window);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let previous = count.swap(0, Ordering::AcqRel);
            debug!(previous, "Fixed window reset");
        }
    }

    /// Cancel the reset task.
    ///
    /// Idempotent and callable from any thread. The limiter keeps answering
    /// [`admit`](Limiter::admit) with whatever count had accumulated.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.reset_task.abort();
            info!(
                count = self.count.load(Ordering::Acquire),
                "Stopped fixed window reset task"
            );
        }
    }

    /// Whether [`stop`](Self::stop) has been called
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Calls counted in the current window, including denied ones
    pub fn current_count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Limiter for FixedWindowLimiter {
    fn admit(&self) -> bool {
        let count = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        count <= u64::from(self.limit)
    }
}

impl Drop for FixedWindowLimiter {
    fn drop(&mut self) {
        self.reset_task.abort();
    }
}
