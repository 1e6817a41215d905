//! Active health checking.
//!
//! # Responsibilities
//! - Periodically sweep every backend
//! - Stop promptly on shutdown

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::load_balancer::pool::ServerPool;

pub struct HealthMonitor {
    pool: Arc<ServerPool>,
    interval: Duration,
    timeout: Duration,
}

impl HealthMonitor {
    pub fn new(pool: Arc<ServerPool>, config: &HealthCheckConfig) -> Self {
        Self {
            pool,
            interval: config.interval(),
            timeout: config.timeout(),
        }
    }

    /// Run sweeps until the shutdown signal fires. The first sweep runs immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.timeout.as_secs(),
            backends = self.pool.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting health check sweep");
                    let summary = self.pool.health_check(self.timeout).await;
                    tracing::debug!(alive = summary.alive, dead = summary.dead, "Health check sweep completed");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
