//! Pipeline stage enforcing request quotas.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::HeaderName;
use http::HeaderValue;
use parking_lot::RwLock;

use crate::pipeline::{Rejection, RequestContext, Stage};

use super::limiter::RateLimiter;
use super::rules::QuotaRules;

/// Limit applied to the current window.
pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
/// Requests remaining in the current window.
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
/// Epoch second at which the current window resets.
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Enforces per-endpoint quotas ahead of the handler.
///
/// The quota headers are staged on every pass, so allowed and rejected
/// responses both carry them. Rules can be swapped at runtime; in-flight
/// requests keep the rules they started with.
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
    rules: RwLock<QuotaRules>,
}

impl RateLimitStage {
    /// Create a stage with default rules.
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            limiter,
            rules: RwLock::new(QuotaRules::new()),
        }
    }

    /// Create a stage with the given rules.
    pub fn with_rules(limiter: Arc<RateLimiter>, rules: QuotaRules) -> Self {
        Self {
            limiter,
            rules: RwLock::new(rules),
        }
    }

    /// Replace the quota rules.
    pub fn set_rules(&self, rules: QuotaRules) {
        let mut current = self.rules.write();
        *current = rules;
    }

    /// Get the current rules.
    pub fn rules(&self) -> QuotaRules {
        self.rules.read().clone()
    }

    /// The limiter backing this stage.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// The scope key tying a window counter to one client on one endpoint.
    fn scope_key(ctx: &RequestContext) -> String {
        format!("{}:{}", ctx.endpoint(), ctx.principal().identity())
    }
}

#[async_trait]
impl Stage for RateLimitStage {
    async fn before(&self, ctx: &mut RequestContext) -> std::result::Result<(), Rejection> {
        let policy = self.rules.read().policy_for(ctx.endpoint());
        let scope = Self::scope_key(ctx);

        let decision = self.limiter.check(&scope, &policy).await;

        ctx.insert_header(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
        ctx.insert_header(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
        ctx.insert_header(X_RATELIMIT_RESET, HeaderValue::from(decision.reset));

        if decision.is_exceeded() {
            return Err(Rejection::QuotaExceeded {
                reset: decision.reset,
            });
        }
        Ok(())
    }
}
