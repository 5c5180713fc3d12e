//! Metrics collection and exposition.
//!
//! # Metrics
//! - `balancer_requests_total` (counter): requests by method, status, backend
//! - `balancer_request_duration_seconds` (histogram): end-to-end latency
//! - `balancer_retries_total` (counter): same-backend retries by backend
//! - `balancer_failovers_total` (counter): switches to another backend
//! - `balancer_backend_live` (gauge): 1=live, 0=dead

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    metrics::counter!(
        "balancer_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "balancer_request_duration_seconds",
        "method" => method.to_string(),
        "backend" => backend.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(backend: &str) {
    metrics::counter!("balancer_retries_total", "backend" => backend.to_string()).increment(1);
}

pub fn record_failover() {
    metrics::counter!("balancer_failovers_total").increment(1);
}

pub fn record_backend_liveness(backend: &str, live: bool) {
    metrics::gauge!("balancer_backend_live", "backend" => backend.to_string())
        .set(if live { 1.0 } else { 0.0 });
}
