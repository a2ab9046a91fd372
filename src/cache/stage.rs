//! Pipeline stages producing caching headers.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CACHE_CONTROL, ETAG};
use http::{HeaderValue, StatusCode};
use tracing::trace;

use crate::error::{Result, TollgateError};
use crate::pipeline::{RequestContext, Response, Stage};

use super::etag::{any_tag_match, body_fingerprint};

/// Directives attached by [`CacheControlStage::no_cache`].
pub const NO_CACHE_DIRECTIVES: &str = "no-cache, no-store, max-age=0";

/// Fingerprints successful responses and answers conditional requests.
///
/// Runs after the handler on the final body. An `If-Match` list that fails
/// to match becomes an empty 412; otherwise an `If-None-Match` list that
/// does match becomes an empty 304. Either way the fingerprint header stays
/// on the response.
#[derive(Debug, Default)]
pub struct EtagStage;

impl EtagStage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for EtagStage {
    async fn after(&self, ctx: &mut RequestContext, response: &mut Response) {
        // Validators only apply to successful responses.
        if !response.status().is_success() {
            return;
        }

        let tag = body_fingerprint(response.body());
        // Quoted hex is always a valid header value.
        ctx.insert_header(ETAG, HeaderValue::from_str(&tag).unwrap());

        if let Some(if_match) = ctx.if_match() {
            if !any_tag_match(if_match, &tag) {
                trace!(tag = %tag, "If-Match precondition failed");
                *response.status_mut() = StatusCode::PRECONDITION_FAILED;
                *response.body_mut() = Bytes::new();
            }
        } else if let Some(if_none_match) = ctx.if_none_match() {
            if any_tag_match(if_none_match, &tag) {
                trace!(tag = %tag, "Entity unchanged, responding not modified");
                *response.status_mut() = StatusCode::NOT_MODIFIED;
                *response.body_mut() = Bytes::new();
            }
        }
    }
}

/// Attaches fixed `Cache-Control` directives to every response.
pub struct CacheControlStage {
    directives: HeaderValue,
}

impl CacheControlStage {
    /// Attach an arbitrary directive string.
    pub fn new(directives: &str) -> Result<Self> {
        let value = HeaderValue::from_str(directives).map_err(|_| {
            TollgateError::Config(format!("invalid cache-control directives: {}", directives))
        })?;
        Ok(Self { directives: value })
    }

    /// Forbid storing or reusing the response.
    pub fn no_cache() -> Self {
        Self {
            directives: HeaderValue::from_static(NO_CACHE_DIRECTIVES),
        }
    }
}

#[async_trait]
impl Stage for CacheControlStage {
    async fn after(&self, ctx: &mut RequestContext, _response: &mut Response) {
        ctx.insert_header(CACHE_CONTROL, self.directives.clone());
    }
}
