//! The stage contract and pre-handler rejections.

use async_trait::async_trait;
use chrono::Utc;
use http::header::{CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderValue, StatusCode};
use serde_json::json;

use super::context::{response, RequestContext, Response};

/// A unit of request-control behavior.
///
/// Before hooks run in registration order ahead of the handler and may
/// reject the request. After hooks run in reverse order on the handler's
/// response (or not at all when a before hook rejected).
#[async_trait]
pub trait Stage: Send + Sync {
    /// Inspects the request before the handler runs.
    async fn before(&self, _ctx: &mut RequestContext) -> Result<(), Rejection> {
        Ok(())
    }

    /// Transforms the response after the handler ran.
    async fn after(&self, _ctx: &mut RequestContext, _response: &mut Response) {}
}

/// Why a before hook refused to let the request through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The principal lacks a required permission.
    Forbidden,
    /// The caller exhausted its quota for the current window.
    QuotaExceeded {
        /// Epoch second at which the window resets.
        reset: u64,
    },
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::Forbidden => StatusCode::FORBIDDEN,
            Rejection::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Renders the rejection as a JSON error response.
    pub fn into_response(self) -> Response {
        let mut resp = match &self {
            Rejection::Forbidden => {
                let body = json!({
                    "error": "forbidden",
                    "code": "FORBIDDEN",
                });
                response(self.status(), body.to_string())
            }
            Rejection::QuotaExceeded { reset } => {
                let retry_after = retry_after_secs(*reset);
                let body = json!({
                    "error": "rate limit exceeded",
                    "code": "RATE_LIMITED",
                    "retry_after_secs": retry_after,
                });
                let mut resp = response(self.status(), body.to_string());
                resp.headers_mut()
                    .insert(RETRY_AFTER, HeaderValue::from(retry_after));
                resp
            }
        };
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        resp
    }
}

/// Whole seconds until the reset instant, never less than one.
fn retry_after_secs(reset: u64) -> u64 {
    reset.saturating_sub(Utc::now().timestamp() as u64).max(1)
}
