//! `round-robin-lb` entry point.
//!
//! ```text
//! round-robin-lb --backends http://10.0.0.1:8080,http://10.0.0.2:8080 --port 3030
//! round-robin-lb --config lb.toml
//! ```

use std::path::PathBuf;

use clap::Parser;

use round_robin_lb::config::{read_config, BackendConfig, LbConfig};
use round_robin_lb::lifecycle;
use round_robin_lb::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "round-robin-lb", version)]
#[command(about = "Round-robin HTTP load balancer with health checks and failover", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URLs, comma separated. Replaces the configured list.
    #[arg(short, long, value_delimiter = ',')]
    backends: Vec<String>,

    /// Port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Seconds between health check sweeps.
    #[arg(long)]
    health_interval_secs: Option<u64>,

    /// Seconds before a health probe gives up.
    #[arg(long)]
    probe_timeout_secs: Option<u64>,

    /// Forwarding attempts against one backend before it is marked dead.
    #[arg(long)]
    max_retries: Option<u32>,

    /// Log level when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Apply command line overrides on top of `config`.
    fn apply(self, config: &mut LbConfig) {
        if !self.backends.is_empty() {
            config.backends = self
                .backends
                .into_iter()
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .map(BackendConfig::new)
                .collect();
        }
        if let Some(port) = self.port {
            config.listener.bind_address = match config.listener.bind_address.parse::<std::net::SocketAddr>() {
                Ok(mut addr) => {
                    addr.set_port(port);
                    addr.to_string()
                }
                Err(_) => format!("0.0.0.0:{}", port),
            };
        }
        if let Some(secs) = self.health_interval_secs {
            config.health_check.interval_secs = secs;
        }
        if let Some(secs) = self.probe_timeout_secs {
            config.health_check.timeout_secs = secs;
        }
        if let Some(max_retries) = self.max_retries {
            config.retries.max_retries = max_retries;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => LbConfig::default(),
    };
    cli.apply(&mut config);

    logging::init(&config.observability.log_level);

    tracing::info!("round-robin-lb v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        health_interval_secs = config.health_check.interval_secs,
        max_retries = config.retries.max_retries,
        "Configuration loaded"
    );

    lifecycle::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
