//! Fixed-window rate limiting against a shared counter store.
//!
//! The limiter holds no per-key state of its own: each check computes the
//! current window from the clock and delegates the count to the store's
//! atomic increment, so any number of processes sharing a store enforce one
//! combined limit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, trace, warn};

use crate::error::{Result, TollgateError};
use crate::store::QuotaStore;

use super::window::FixedWindow;

/// Default requests allowed when no specific policy is configured.
const DEFAULT_LIMIT: u64 = 1000;
/// Default window period when no specific policy is configured.
const DEFAULT_PERIOD_SECS: u64 = 60;

/// A quota policy: at most `limit` requests per window of `period_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    limit: u64,
    period_secs: u64,
}

impl RatePolicy {
    /// Create a policy. Zero limits and zero periods are rejected.
    pub fn new(limit: u64, period_secs: u64) -> Result<Self> {
        if limit == 0 {
            return Err(TollgateError::Config("rate limit must be positive".into()));
        }
        if period_secs == 0 {
            return Err(TollgateError::Config(
                "rate limit period must be positive".into(),
            ));
        }
        Ok(Self { limit, period_secs })
    }

    /// Maximum requests allowed per window.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Window period in seconds.
    pub fn period_secs(&self) -> u64 {
        self.period_secs
    }
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            period_secs: DEFAULT_PERIOD_SECS,
        }
    }
}

/// Outcome code for a quota check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitStatus {
    /// The request fits within the window limit.
    Allowed,
    /// The window limit is exhausted.
    Exceeded,
}

/// The result of a quota check, carrying everything the response headers
/// need regardless of outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitDecision {
    /// Outcome of the check.
    pub status: LimitStatus,
    /// The limit that applied.
    pub limit: u64,
    /// Requests left in the window, never negative.
    pub remaining: u64,
    /// Epoch second at which the window resets.
    pub reset: u64,
    /// True when the store was unreachable and the check failed open.
    pub degraded: bool,
}

impl LimitDecision {
    /// True when the request should be rejected.
    pub fn is_exceeded(&self) -> bool {
        self.status == LimitStatus::Exceeded
    }
}

/// A fixed-window rate limiter backed by a shared counter store.
pub struct RateLimiter {
    store: Arc<dyn QuotaStore>,
    store_failures: AtomicU64,
}

impl RateLimiter {
    /// Create a rate limiter over the given store.
    pub fn new(store: Arc<dyn QuotaStore>) -> Self {
        Self {
            store,
            store_failures: AtomicU64::new(0),
        }
    }

    /// Check and consume quota for `scope_key` under `policy`.
    ///
    /// Increments the counter for the current window and reports the
    /// outcome. A store failure is not an error for the caller: the check
    /// fails open and the returned decision is marked degraded.
    pub async fn check(&self, scope_key: &str, policy: &RatePolicy) -> LimitDecision {
        let now = Utc::now().timestamp() as u64;
        self.check_at(scope_key, policy, now).await
    }

    async fn check_at(&self, scope_key: &str, policy: &RatePolicy, now: u64) -> LimitDecision {
        let window = FixedWindow::containing(now, policy.period_secs());
        let counter_key = window.counter_key(scope_key);

        trace!(
            scope = %scope_key,
            window = window.start(),
            limit = policy.limit(),
            "Checking rate limit"
        );

        let count = match self
            .store
            .increment_and_expire(&counter_key, Duration::from_secs(policy.period_secs()))
            .await
        {
            Ok(count) => count,
            Err(e) => {
                self.store_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    scope = %scope_key,
                    error = %e,
                    "Quota store unavailable, failing open"
                );
                // Count the current request against an otherwise unknown
                // window so the advertised remaining stays plausible.
                return LimitDecision {
                    status: LimitStatus::Allowed,
                    limit: policy.limit(),
                    remaining: policy.limit().saturating_sub(1),
                    reset: window.reset(),
                    degraded: true,
                };
            }
        };

        let remaining = policy.limit().saturating_sub(count);
        let status = if count <= policy.limit() {
            LimitStatus::Allowed
        } else {
            debug!(
                scope = %scope_key,
                count,
                limit = policy.limit(),
                "Rate limit exceeded"
            );
            LimitStatus::Exceeded
        };

        LimitDecision {
            status,
            limit: policy.limit(),
            remaining,
            reset: window.reset(),
            degraded: false,
        }
    }

    /// Current counter value for a scope in the present window.
    pub async fn current_usage(&self, scope_key: &str, policy: &RatePolicy) -> Result<u64> {
        let now = Utc::now().timestamp() as u64;
        let window = FixedWindow::containing(now, policy.period_secs());
        Ok(self.store.get(&window.counter_key(scope_key)).await?)
    }

    /// Number of checks that failed open because the store was unreachable.
    pub fn store_failures(&self) -> u64 {
        self.store_failures.load(Ordering::Relaxed)
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn QuotaStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;

    struct FailingStore;

    #[async_trait]
    impl QuotaStore for FailingStore {
        async fn increment_and_expire(
            &self,
            _key: &str,
            _ttl: Duration,
        ) -> std::result::Result<u64, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn get(&self, _key: &str) -> std::result::Result<u64, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn expire(
            &self,
            _key: &str,
            _ttl: Duration,
        ) -> std::result::Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn time_to_live(
            &self,
            _key: &str,
        ) -> std::result::Result<Option<Duration>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    struct TimingOutStore;

    #[async_trait]
    impl QuotaStore for TimingOutStore {
        async fn increment_and_expire(
            &self,
            _key: &str,
            _ttl: Duration,
        ) -> std::result::Result<u64, StoreError> {
            Err(StoreError::Timeout(Duration::from_millis(500)))
        }

        async fn get(&self, _key: &str) -> std::result::Result<u64, StoreError> {
            Err(StoreError::Timeout(Duration::from_millis(500)))
        }

        async fn expire(
            &self,
            _key: &str,
            _ttl: Duration,
        ) -> std::result::Result<bool, StoreError> {
            Err(StoreError::Timeout(Duration::from_millis(500)))
        }

        async fn time_to_live(
            &self,
            _key: &str,
        ) -> std::result::Result<Option<Duration>, StoreError> {
            Err(StoreError::Timeout(Duration::from_millis(500)))
        }
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_policy_rejects_zero_values() {
        assert!(RatePolicy::new(0, 60).is_err());
        assert!(RatePolicy::new(10, 0).is_err());
        assert!(RatePolicy::new(10, 60).is_ok());
    }

    #[tokio::test]
    async fn test_remaining_decreases_until_exhausted() {
        let limiter = limiter();
        let policy = RatePolicy::new(5, 60).unwrap();

        for expected_remaining in (0..5).rev() {
            let decision = limiter.check("items.list:10.0.0.1", &policy).await;
            assert_eq!(decision.status, LimitStatus::Allowed);
            assert_eq!(decision.limit, 5);
            assert_eq!(decision.remaining, expected_remaining);
            assert!(!decision.degraded);
        }

        let decision = limiter.check("items.list:10.0.0.1", &policy).await;
        assert_eq!(decision.status, LimitStatus::Exceeded);
        assert_eq!(decision.remaining, 0);
        assert!(decision.is_exceeded());
    }

    #[tokio::test]
    async fn test_scopes_are_counted_apart() {
        let limiter = limiter();
        let policy = RatePolicy::new(2, 60).unwrap();

        limiter.check("items.list:10.0.0.1", &policy).await;
        limiter.check("items.list:10.0.0.1", &policy).await;
        let decision = limiter.check("items.list:10.0.0.2", &policy).await;

        assert_eq!(decision.status, LimitStatus::Allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[tokio::test]
    async fn test_reset_lands_on_window_boundary() {
        let limiter = limiter();
        let policy = RatePolicy::new(5, 60).unwrap();

        let decision = limiter.check_at("scope", &policy, 1_000).await;
        assert_eq!(decision.reset, 1_020);
    }

    #[tokio::test]
    async fn test_new_window_starts_fresh() {
        let limiter = limiter();
        let policy = RatePolicy::new(2, 60).unwrap();

        // Exhaust the window that starts at 0.
        assert!(!limiter.check_at("scope", &policy, 59).await.is_exceeded());
        assert!(!limiter.check_at("scope", &policy, 59).await.is_exceeded());
        assert!(limiter.check_at("scope", &policy, 59).await.is_exceeded());

        // The reset instant belongs to the next window.
        let decision = limiter.check_at("scope", &policy, 60).await;
        assert_eq!(decision.status, LimitStatus::Allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let limiter = RateLimiter::new(Arc::new(FailingStore));
        let policy = RatePolicy::new(10, 60).unwrap();

        let decision = limiter.check("scope", &policy).await;
        assert_eq!(decision.status, LimitStatus::Allowed);
        assert!(decision.degraded);
        assert_eq!(decision.remaining, 9);
        assert_eq!(limiter.store_failures(), 1);

        limiter.check("scope", &policy).await;
        assert_eq!(limiter.store_failures(), 2);
    }

    #[tokio::test]
    async fn test_store_timeout_fails_open() {
        let limiter = RateLimiter::new(Arc::new(TimingOutStore));
        let policy = RatePolicy::new(10, 60).unwrap();

        let decision = limiter.check("scope", &policy).await;
        assert_eq!(decision.status, LimitStatus::Allowed);
        assert!(decision.degraded);
        assert_eq!(decision.remaining, 9);
        assert_eq!(limiter.store_failures(), 1);
    }

    #[tokio::test]
    async fn test_current_usage_reads_without_counting() {
        let limiter = limiter();
        let policy = RatePolicy::new(5, 60).unwrap();

        limiter.check("scope", &policy).await;
        limiter.check("scope", &policy).await;

        assert_eq!(limiter.current_usage("scope", &policy).await.unwrap(), 2);
        assert_eq!(limiter.current_usage("scope", &policy).await.unwrap(), 2);
    }
}
