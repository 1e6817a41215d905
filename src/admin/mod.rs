//! Read-only admin API.
//!
//! Exposes pool state over HTTP on a separate listener. There are no mutating
//! endpoints; the backend set is fixed at startup.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use crate::load_balancer::pool::ServerPool;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub pool: Arc<ServerPool>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(pool: Arc<ServerPool>, api_key: &str) -> Router {
    let state = AdminState {
        pool,
        api_key: Arc::from(api_key),
    };

    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/backends", get(get_backends))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
