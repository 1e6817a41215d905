//! Backend pool management.
//!
//! # Responsibilities
//! - Hold the ordered backend registry built at startup
//! - Select the next alive backend round-robin
//! - Flip liveness by address for the request path
//! - Run one active health-check sweep over every backend

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use thiserror::Error;
use url::Url;

use crate::config::{parse_backend_url, LbConfig, ValidationError};
use crate::health::probe::{probe, ProbeError};
use crate::load_balancer::{
    backend::{Backend, BackendError},
    round_robin::RoundRobin,
    transport::build_client,
};
use crate::observability::metrics;

/// Errors building a pool from configuration.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error(transparent)]
    InvalidAddress(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Outcome of one health-check sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub alive: usize,
    pub dead: usize,
}

/// Ordered registry of backends plus the shared round-robin cursor.
#[derive(Debug, Default)]
pub struct ServerPool {
    backends: Vec<Arc<Backend>>,
    selector: RoundRobin,
}

impl ServerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool of HTTP backends from configuration.
    /// Any unusable address fails the whole build.
    pub fn from_config(config: &LbConfig) -> Result<Self, PoolError> {
        let client = build_client(Duration::from_secs(config.timeouts.connect_secs));
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);

        let mut pool = Self::new();
        for backend_config in &config.backends {
            let url = parse_backend_url(&backend_config.url)?;
            let mut backend = Backend::http(url, client.clone(), request_timeout)?;
            if let Some(name) = &backend_config.name {
                backend = backend.with_name(name.clone());
            }

            tracing::info!(backend = %backend.address(), name = %backend.name(), "Configured backend");
            pool.add_backend(Arc::new(backend));
        }

        Ok(pool)
    }

    /// Append a backend. Requires exclusive access, so it can only happen
    /// before the pool is shared with request handlers.
    pub fn add_backend(&mut self, backend: Arc<Backend>) {
        self.backends.push(backend);
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn alive_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_alive()).count()
    }

    /// Select the next alive backend, or `None` if every backend is dead
    /// or the pool is empty.
    pub fn next_peer(&self) -> Option<Arc<Backend>> {
        let peer = self.selector.next_server(&self.backends);
        if peer.is_none() {
            tracing::debug!(backend_count = self.backends.len(), "No alive backends in pool");
        }
        peer
    }

    /// Set the liveness of the backend with the given address.
    /// Returns `false` if no backend matches.
    pub fn mark_backend_status(&self, address: &Url, alive: bool) -> bool {
        match self.backends.iter().find(|b| b.address() == address) {
            Some(backend) => {
                let was_alive = backend.set_alive(alive);
                if was_alive != alive {
                    tracing::warn!(
                        backend = %address,
                        status = if alive { "up" } else { "down" },
                        "Backend status changed"
                    );
                }
                metrics::record_backend_health(backend.name(), alive);
                true
            }
            None => {
                tracing::debug!(backend = %address, "Backend not found in pool");
                false
            }
        }
    }

    /// Probe every backend concurrently and store the results.
    ///
    /// Each probe has its own deadline, so one slow backend delays the sweep
    /// by at most `timeout`.
    pub async fn health_check(&self, timeout: Duration) -> SweepSummary {
        self.sweep(|target| probe(target, timeout)).await
    }

    /// Run `prober` against every backend's probe target at once.
    async fn sweep<'a, F, Fut>(&'a self, prober: F) -> SweepSummary
    where
        F: Fn(&'a str) -> Fut,
        Fut: Future<Output = Result<(), ProbeError>>,
    {
        let prober = &prober;
        let probes = self.backends.iter().map(|backend| async move {
            let result = prober(backend.probe_target()).await;
            (backend, result)
        });

        let mut summary = SweepSummary::default();
        for (backend, result) in join_all(probes).await {
            let alive = result.is_ok();
            let was_alive = backend.set_alive(alive);

            match &result {
                Ok(()) => tracing::info!(backend = %backend.address(), status = "up", "Health check"),
                Err(e) => tracing::info!(backend = %backend.address(), status = "down", error = %e, "Health check"),
            }
            if was_alive != alive {
                tracing::warn!(
                    backend = %backend.address(),
                    status = if alive { "up" } else { "down" },
                    "Backend status changed by health check"
                );
            }
            metrics::record_backend_health(backend.name(), alive);

            if alive {
                summary.alive += 1;
            } else {
                summary.dead += 1;
            }
        }

        summary
    }
}
