//! Per-request dispatch.
//!
//! # State Machine
//! ```text
//! START → SELECT_BACKEND ──none──────────────────────────▶ [503]
//!              │
//!              ▼
//!           FORWARD ──ok──────────────────────────────────▶ [response streamed]
//!              │ error
//!              ▼
//!       RetryContext::record_failure
//!          RetrySame → backoff → FORWARD (same backend)
//!          Failover  → mark dead → SELECT_BACKEND
//!          Exhausted → [503]
//! ```
//!
//! # Design Decisions
//! - The request body is buffered once so every attempt can replay it
//! - A retry is only possible before the response head arrives; once a
//!   response is returned its body streams and is never retried
//! - A client disconnect drops this future, aborting the in-flight attempt
//!   without touching backend state

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    http::{request::Parts, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tokio::time;

use crate::config::LimitsConfig;
use crate::http::request::RequestIdExt;
use crate::load_balancer::pool::ServerPool;
use crate::observability::metrics;
use crate::resilience::retries::{RetryContext, RetryDecision, RetryPolicy};

/// Selects a backend for each request and drives retries and failover.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pool: Arc<ServerPool>,
    policy: RetryPolicy,
    max_body_bytes: usize,
}

impl Dispatcher {
    pub fn new(pool: Arc<ServerPool>, policy: RetryPolicy) -> Self {
        Self {
            pool,
            policy,
            max_body_bytes: LimitsConfig::default().max_body_bytes,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Forward `request` to a live backend, or answer 503.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let request_id = request.request_id();
        let (parts, body) = request.into_parts();

        let body = match read_body(body, self.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(response) => {
                metrics::record_request(parts.method.as_str(), response.status().as_u16(), "none", start);
                return response;
            }
        };

        let mut ctx = RetryContext::new(self.policy.total_budget(self.pool.len()));
        let Some(mut backend) = self.pool.next_peer() else {
            tracing::warn!(request_id = ?request_id, "No alive backends");
            return unavailable(&parts.method, start);
        };

        loop {
            tracing::debug!(
                request_id = ?request_id,
                backend = %backend.address(),
                attempt = ctx.attempts() + 1,
                "Forwarding request"
            );

            let error = match backend.forward(replay(&parts, body.clone())).await {
                Ok(response) => {
                    metrics::record_request(
                        parts.method.as_str(),
                        response.status().as_u16(),
                        backend.name(),
                        start,
                    );
                    return response;
                }
                Err(e) => e,
            };

            metrics::record_forward_failure(backend.name(), error.kind());
            let decision = ctx.record_failure(&self.policy);
            tracing::warn!(
                request_id = ?request_id,
                backend = %backend.address(),
                attempt = ctx.attempts(),
                total_attempts = ctx.total_attempts(),
                error = %error,
                decision = ?decision,
                "Upstream error"
            );

            match decision {
                RetryDecision::RetrySame => {
                    time::sleep(self.policy.backoff(ctx.attempts())).await;
                }
                RetryDecision::Failover => {
                    self.pool.mark_backend_status(backend.address(), false);
                    ctx.reset_backend();
                    backend = match self.pool.next_peer() {
                        Some(next) => next,
                        None => {
                            tracing::warn!(request_id = ?request_id, "No alive backends left after failover");
                            return unavailable(&parts.method, start);
                        }
                    };
                }
                RetryDecision::Exhausted { mark_dead } => {
                    if mark_dead {
                        self.pool.mark_backend_status(backend.address(), false);
                    }
                    tracing::warn!(
                        request_id = ?request_id,
                        total_attempts = ctx.total_attempts(),
                        "Attempt budget exhausted"
                    );
                    return unavailable(&parts.method, start);
                }
            }
        }
    }
}

/// Buffer the request body, rejecting bodies over `limit`.
async fn read_body(body: Body, limit: usize) -> Result<Bytes, Response> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => {
            Err((StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response())
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to read request body");
            Err((StatusCode::BAD_REQUEST, "Failed to read request body").into_response())
        }
    }
}

/// Rebuild the inbound request for one forwarding attempt.
fn replay(parts: &Parts, body: Bytes) -> Request<Body> {
    let mut request = Request::new(Body::from(body));
    *request.method_mut() = parts.method.clone();
    *request.uri_mut() = parts.uri.clone();
    *request.version_mut() = parts.version;
    *request.headers_mut() = parts.headers.clone();
    request
}

fn unavailable(method: &Method, start: Instant) -> Response {
    metrics::record_request(method.as_str(), 503, "none", start);
    (StatusCode::SERVICE_UNAVAILABLE, "Service not available").into_response()
}
