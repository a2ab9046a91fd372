//! Per-request state shared across stages.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use uuid::Uuid;

use crate::access::Principal;

/// Responses carry a contiguous body so stages can fingerprint it.
pub type Response = http::Response<Bytes>;

/// Builds a response with the given status and body.
pub fn response(status: StatusCode, body: impl Into<Bytes>) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response
}

/// Builds a response with an empty body.
pub fn empty_response(status: StatusCode) -> Response {
    response(status, Bytes::new())
}

/// Per-request state threaded through the pipeline.
///
/// Stages stage headers here rather than writing to the response directly,
/// so a rejection produced before the handler runs still carries them. The
/// accumulated headers are merged into whichever response leaves the
/// pipeline.
#[derive(Debug)]
pub struct RequestContext {
    request_id: Uuid,
    endpoint: String,
    principal: Principal,
    if_none_match: Option<String>,
    if_match: Option<String>,
    headers: HeaderMap,
}

impl RequestContext {
    pub fn new(endpoint: impl Into<String>, principal: Principal) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            endpoint: endpoint.into(),
            principal,
            if_none_match: None,
            if_match: None,
            headers: HeaderMap::new(),
        }
    }

    /// Records the request's `If-None-Match` header.
    pub fn with_if_none_match(mut self, tags: impl Into<String>) -> Self {
        self.if_none_match = Some(tags.into());
        self
    }

    /// Records the request's `If-Match` header.
    pub fn with_if_match(mut self, tags: impl Into<String>) -> Self {
        self.if_match = Some(tags.into());
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn if_none_match(&self) -> Option<&str> {
        self.if_none_match.as_deref()
    }

    pub fn if_match(&self) -> Option<&str> {
        self.if_match.as_deref()
    }

    /// Stages a header for the outgoing response, replacing any prior value.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Drains the staged headers into the response.
    pub fn merge_into(&mut self, response: &mut Response) {
        response
            .headers_mut()
            .extend(std::mem::take(&mut self.headers));
    }
}
