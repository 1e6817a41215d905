//! Request identification.
//!
//! Every inbound request gets a UUID v4 stored in its extensions and recorded
//! on a tracing span. Headers are left alone so the forwarded request is
//! byte-for-byte what the client sent.

use std::fmt;

use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Unique identifier of one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access the request ID assigned by [`assign_request_id`].
pub trait RequestIdExt {
    fn request_id(&self) -> Option<RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<RequestId> {
        self.extensions().get::<RequestId>().copied()
    }
}

/// Middleware attaching a fresh [`RequestId`] and a span carrying it.
pub async fn assign_request_id(mut request: Request<Body>, next: Next) -> Response {
    let id = RequestId::new();
    request.extensions_mut().insert(id);

    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    next.run(request).instrument(span).await
}
