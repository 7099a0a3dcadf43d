//! Request identification.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the client sent none
//! - Expose the ID and the matched route to middleware
//!
//! # Design Decisions
//! - Request ID added as early as possible so every later layer sees it
//! - An incoming `x-request-id` is kept as-is (tower-http semantics)

use std::fmt;

use axum::extract::MatchedPath;
use axum::http::{HeaderValue, Request};
use tower_http::request_id::MakeRequestId;
use uuid::Uuid;

/// Header carrying the request ID in both directions.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Route label for requests no route matched. Keeps raw paths out of
/// metric attributes and span names.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Identifier of a single request, shared with the telemetry context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// [`MakeRequestId`] producing UUID v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdGenerator;

impl MakeRequestId for RequestIdGenerator {
    fn make_request_id<B>(
        &mut self,
        _request: &Request<B>,
    ) -> Option<tower_http::request_id::RequestId> {
        let id = RequestId::generate();
        HeaderValue::from_str(id.as_str())
            .ok()
            .map(tower_http::request_id::RequestId::new)
    }
}

/// Accessors for request metadata set by earlier layers.
pub trait RequestIdExt {
    /// ID assigned by the request-id layer, if it ran.
    fn request_id(&self) -> Option<RequestId>;

    /// Matched route template, `None` when no route matched.
    fn route(&self) -> Option<String>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<RequestId> {
        let header = self
            .extensions()
            .get::<tower_http::request_id::RequestId>()
            .map(|id| id.header_value())
            .or_else(|| self.headers().get(X_REQUEST_ID))?;

        header.to_str().ok().map(RequestId::new)
    }

    fn route(&self) -> Option<String> {
        self.extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_owned())
    }
}
