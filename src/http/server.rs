//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a catch-all proxy route
//! - Wire up middleware (tracing, request ID)
//! - Spawn the health monitor alongside the server
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::LbConfig;
use crate::health::active::HealthMonitor;
use crate::http::dispatcher::Dispatcher;
use crate::http::request::assign_request_id;
use crate::load_balancer::pool::{PoolError, ServerPool};
use crate::resilience::retries::RetryPolicy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP front end of the load balancer.
pub struct HttpServer {
    router: Router,
    config: LbConfig,
    pool: Arc<ServerPool>,
}

impl HttpServer {
    /// Build the backend pool from configuration and wire the server around it.
    pub fn new(config: LbConfig) -> Result<Self, PoolError> {
        let pool = Arc::new(ServerPool::from_config(&config)?);
        Ok(Self::with_pool(config, pool))
    }

    /// Wire the server around an existing pool.
    pub fn with_pool(config: LbConfig, pool: Arc<ServerPool>) -> Self {
        let dispatcher = Dispatcher::new(pool.clone(), RetryPolicy::from_config(&config.retries))
            .with_max_body_bytes(config.limits.max_body_bytes);

        let state = AppState {
            dispatcher: Arc::new(dispatcher),
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            pool,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(middleware::from_fn(assign_request_id)),
            )
    }

    pub fn pool(&self) -> Arc<ServerPool> {
        self.pool.clone()
    }

    pub fn config(&self) -> &LbConfig {
        &self.config
    }

    /// A clone of the router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "HTTP server starting"
        );

        if self.config.health_check.enabled {
            let monitor = HealthMonitor::new(self.pool.clone(), &self.config.health_check);
            tokio::spawn(monitor.run(shutdown.resubscribe()));
        } else {
            tracing::info!("Active health checks disabled");
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    state.dispatcher.dispatch(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::testing::stub_backend;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_empty_pool_returns_503() {
        let server = HttpServer::with_pool(LbConfig::default(), Arc::new(ServerPool::new()));

        let response = server
            .router()
            .oneshot(Request::builder().uri("http://example.com/foo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_routes_any_method_and_path() {
        let mut pool = ServerPool::new();
        pool.add_backend(stub_backend("http://127.0.0.1:9"));
        let server = HttpServer::with_pool(LbConfig::default(), Arc::new(pool));

        for (method, uri) in [("GET", "/"), ("DELETE", "/a/b/c"), ("OPTIONS", "/x?y=z")] {
            let response = server
                .router()
                .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{method} {uri}");
        }
    }

    #[test]
    fn test_new_rejects_invalid_backend() {
        let mut config = LbConfig::default();
        config.backends.push(crate::config::BackendConfig::new("mailto:ops@example.com"));
        assert!(HttpServer::new(config).is_err());
    }
}
