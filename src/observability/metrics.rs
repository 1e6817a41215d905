//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): requests by method, status, backend
//! - `lb_request_duration_seconds` (histogram): end-to-end latency
//! - `lb_forward_failures_total` (counter): failed attempts by backend and kind
//! - `lb_backend_up` (gauge): 1=alive, 0=dead

use std::net::SocketAddr;
use std::time::Instant;

use metrics::Label;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("backend", backend.to_string()),
    ];
    metrics::counter!("lb_requests_total", labels.clone()).increment(1);
    metrics::histogram!("lb_request_duration_seconds", labels).record(start.elapsed().as_secs_f64());
}

pub fn record_forward_failure(backend: &str, kind: &'static str) {
    metrics::counter!(
        "lb_forward_failures_total",
        "backend" => backend.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_backend_health(backend: &str, alive: bool) {
    metrics::gauge!("lb_backend_up", "backend" => backend.to_string()).set(if alive { 1.0 } else { 0.0 });
}
