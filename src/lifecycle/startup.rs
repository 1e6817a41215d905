//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the backend pool (an unusable backend address is fatal)
//! - Start background tasks (metrics exporter, admin API, signal watcher)
//! - Bind the listener and serve until shutdown

use std::net::SocketAddr;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::setup_admin_router;
use crate::config::{validate_config, ConfigError, LbConfig, ValidationError};
use crate::http::HttpServer;
use crate::lifecycle::{shutdown::Shutdown, signals};
use crate::load_balancer::pool::PoolError;
use crate::observability::metrics;

/// Fatal errors before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build backend pool: {0}")]
    Pool(#[from] PoolError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Start every subsystem and serve until a shutdown signal arrives.
pub async fn run(config: LbConfig) -> Result<(), StartupError> {
    validate_config(&config).map_err(ConfigError::from)?;

    if config.backends.is_empty() {
        tracing::warn!("No backends configured; every request will be answered with 503");
    }

    let server = HttpServer::new(config.clone())?;

    if config.observability.metrics_enabled {
        let addr = socket_addr("observability.metrics_address", &config.observability.metrics_address)?;
        metrics::init_metrics(addr)?;
    }

    let listener = bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();

    if config.admin.enabled {
        let admin_listener = bind(&config.admin.bind_address).await?;
        let router = setup_admin_router(server.pool(), &config.admin.api_key);
        let mut admin_shutdown = shutdown.subscribe();
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");

        tokio::spawn(async move {
            let result = axum::serve(admin_listener, router)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        });
    }

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let result = server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve);

    // Stop the remaining background tasks if the server exited on its own.
    shutdown.trigger();
    result
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}

fn socket_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| {
        StartupError::Config(ConfigError::Validation(vec![ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        }]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    #[tokio::test]
    async fn test_invalid_config_is_fatal() {
        let mut config = LbConfig::default();
        config.backends.push(BackendConfig::new("not-a-url"));

        let err = run(config).await.unwrap_err();
        assert!(matches!(err, StartupError::Config(ConfigError::Validation(_))));
    }

    #[tokio::test]
    async fn test_bind_failure_is_fatal() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = LbConfig::default();
        config.listener.bind_address = taken.local_addr().unwrap().to_string();
        config.health_check.enabled = false;

        let err = run(config).await.unwrap_err();
        assert!(matches!(err, StartupError::Bind { .. }));
    }
}
