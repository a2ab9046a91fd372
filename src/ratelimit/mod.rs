//! Rate limiting logic and quota policies.

mod limiter;
mod rules;
mod stage;
mod window;

pub use limiter::{LimitDecision, LimitStatus, RateLimiter, RatePolicy};
pub use rules::{QuotaRule, QuotaRules};
pub use stage::{RateLimitStage, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET};
pub use window::FixedWindow;
