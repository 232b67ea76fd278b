//! Tiered rate limiting over a shared counter store.
//!
//! Every request is charged against up to three scopes, in order:
//!
//! 1. **Global** (`global:`) caps total load
//! 2. **Per-user** (`usr:<identity>`) keeps callers fair to each other
//! 3. **Per-endpoint** (`ep:<endpoint>`) only when the endpoint has its own limit
//!
//! Evaluation stops at the first scope that denies. Scopes already charged
//! stay charged; there is no compensating decrement. Store failures deny the
//! request.

use crate::config::{RateLimiterConfig, ScopeLimit};
use crate::error::{RateLimitError, Result};
use crate::store::CounterStore;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

const GLOBAL_PREFIX: &str = "global:";
const USER_PREFIX: &str = "usr:";
const ENDPOINT_PREFIX: &str = "ep:";

/// One independently limited dimension of traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    PerUser,
    Endpoint,
}

impl Scope {
    /// Counter key for this scope. `id` is ignored for [`Scope::Global`].
    pub fn key(&self, id: &str) -> String {
        match self {
            Scope::Global => GLOBAL_PREFIX.to_string(),
            Scope::PerUser => format!("{}{}", USER_PREFIX, id),
            Scope::Endpoint => format!("{}{}", ENDPOINT_PREFIX, id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Global => "global",
            Scope::PerUser => "per_user",
            Scope::Endpoint => "endpoint",
        };
        f.write_str(name)
    }
}

/// Outcome of a tiered check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Every applicable scope had headroom
    Allowed,
    /// A scope's post-increment count went over its limit
    OverLimit { scope: Scope, count: u64, limit: u64 },
    /// The counter store failed or missed its deadline for a scope
    StoreFailure { scope: Scope, error: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// Scope that denied the request, if any
    pub fn denied_by(&self) -> Option<Scope> {
        match self {
            Decision::Allowed => None,
            Decision::OverLimit { scope, .. } | Decision::StoreFailure { scope, .. } => {
                Some(*scope)
            }
        }
    }
}

/// Rate limiter that composes global, per-user and per-endpoint scopes
pub struct TieredRateLimiter {
    store: Arc<dyn CounterStore>,
    global: ScopeLimit,
    per_user: ScopeLimit,
    endpoints: HashMap<String, ScopeLimit>,
    store_timeout: Option<Duration>,
}

impl fmt::Debug for TieredRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredRateLimiter")
            .field("store", &"<dyn CounterStore>")
            .field("global", &self.global)
            .field("per_user", &self.per_user)
            .field("endpoints", &self.endpoints)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

impl TieredRateLimiter {
    /// Build a limiter from a configuration document and a counter store.
    ///
    /// Fails if any section is missing or invalid.
    pub fn new(config: &RateLimiterConfig, store: Arc<dyn CounterStore>) -> Result<Self> {
        Self::builder().config(config.clone()).store(store).build()
    }

    pub fn builder() -> TieredRateLimiterBuilder {
        TieredRateLimiterBuilder::default()
    }

    /// Whether the action on `endpoint` by `identity` may proceed.
    ///
    /// An empty `endpoint` only matches the global and per-user scopes.
    pub async fn allow(&self, endpoint: &str, identity: &str) -> bool {
        self.evaluate(endpoint, identity, None).await.is_allowed()
    }

    /// Like [`allow`](Self::allow), but any store call still pending at
    /// `deadline` fails and denies the request.
    pub async fn allow_until(&self, endpoint: &str, identity: &str, deadline: Instant) -> bool {
        self.evaluate(endpoint, identity, Some(deadline))
            .await
            .is_allowed()
    }

    /// Evaluate all scopes and report which one denied, if any
    pub async fn check(&self, endpoint: &str, identity: &str) -> Decision {
        self.evaluate(endpoint, identity, None).await
    }

    /// [`check`](Self::check) bounded by `deadline`
    pub async fn check_until(&self, endpoint: &str, identity: &str, deadline: Instant) -> Decision {
        self.evaluate(endpoint, identity, Some(deadline)).await
    }

    async fn evaluate(&self, endpoint: &str, identity: &str, deadline: Option<Instant>) -> Decision {
        let decision = self
            .check_scope(Scope::Global, "", &self.global, deadline)
            .await;
        if !decision.is_allowed() {
            return decision;
        }

        let decision = self
            .check_scope(Scope::PerUser, identity, &self.per_user, deadline)
            .await;
        if !decision.is_allowed() {
            return decision;
        }

        if let Some(limit) = self.endpoints.get(endpoint) {
            return self
                .check_scope(Scope::Endpoint, endpoint, limit, deadline)
                .await;
        }

        Decision::Allowed
    }

    async fn check_scope(
        &self,
        scope: Scope,
        id: &str,
        limit: &ScopeLimit,
        deadline: Option<Instant>,
    ) -> Decision {
        let key = scope.key(id);

        match self.increment(&key, limit.window(), deadline).await {
            Ok(count) if count <= limit.limit() => {
                debug!(key = %key, count, limit = limit.limit(), "Scope within limit");
                Decision::Allowed
            }
            Ok(count) => {
                warn!(
                    scope = %scope,
                    key = %key,
                    count,
                    limit = limit.limit(),
                    "Rate limit exceeded"
                );
                Decision::OverLimit {
                    scope,
                    count,
                    limit: limit.limit(),
                }
            }
            Err(e) => {
                warn!(
                    scope = %scope,
                    key = %key,
                    error = %e,
                    "Counter store failed, denying request"
                );
                Decision::StoreFailure {
                    scope,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn increment(&self, key: &str, window: Duration, deadline: Option<Instant>) -> Result<u64> {
        let deadline = match (deadline, self.store_timeout) {
            (Some(deadline), Some(timeout)) => Some(deadline.min(Instant::now() + timeout)),
            (Some(deadline), None) => Some(deadline),
            (None, Some(timeout)) => Some(Instant::now() + timeout),
            (None, None) => None,
        };

        match deadline {
            None => self.store.increment_with_expiry(key, window).await,
            Some(deadline) if deadline <= Instant::now() => Err(RateLimitError::DeadlineExceeded),
            Some(deadline) => timeout_at(deadline, self.store.increment_with_expiry(key, window))
                .await
                .map_err(|_| RateLimitError::DeadlineExceeded)?,
        }
    }

    pub fn global(&self) -> &ScopeLimit {
        &self.global
    }

    pub fn per_user(&self) -> &ScopeLimit {
        &self.per_user
    }

    /// Limit configured for `endpoint`, if any
    pub fn endpoint(&self, endpoint: &str) -> Option<&ScopeLimit> {
        self.endpoints.get(endpoint)
    }
}

/// Builder for [`TieredRateLimiter`]
#[derive(Default)]
pub struct TieredRateLimiterBuilder {
    config: Option<RateLimiterConfig>,
    store: Option<Arc<dyn CounterStore>>,
    store_timeout: Option<Duration>,
}

impl TieredRateLimiterBuilder {
    pub fn config(mut self, config: RateLimiterConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Bound every counter store call; a call that runs longer denies
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    /// Validate everything and build the limiter
    pub fn build(self) -> Result<TieredRateLimiter> {
        let store = self
            .store
            .ok_or_else(|| RateLimitError::Config("nil store".to_string()))?;
        let config = self.config.unwrap_or_default();

        let global = config.global_limit()?;
        let per_user = config.per_user_limit()?;
        let endpoints = config.endpoint_limits()?;

        info!(
            global_limit = global.limit(),
            global_window = ?global.window(),
            per_user_limit = per_user.limit(),
            per_user_window = ?per_user.window(),
            endpoints = endpoints.len(),
            "Tiered rate limiter initialized"
        );

        Ok(TieredRateLimiter {
            store,
            global,
            per_user,
            endpoints,
            store_timeout: self.store_timeout,
        })
    }
}
