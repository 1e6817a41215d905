use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::admin::AdminState;

/// Require `Authorization: Bearer <api_key>`.
pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if token_matches(&state.api_key, token) => {
            Ok(next.run(request).await)
        }
        _ => {
            tracing::debug!("Rejected admin request with missing or invalid token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Compare without leaking how many leading bytes matched. An empty key
/// never matches.
fn token_matches(expected: &str, token: &str) -> bool {
    !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(token.as_bytes()))
}
