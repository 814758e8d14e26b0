//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by entrypoint, status
//! - `gateway_request_duration_seconds` (histogram): latency by entrypoint
//! - `gateway_snapshots_total` (counter): provider snapshots received
//! - `gateway_config_reloads_total` (counter): rebuild outcomes (success, failure, skipped)
//! - `gateway_rate_limited_total` (counter): requests rejected by rate-limit middlewares

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(entrypoint: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "entrypoint" => entrypoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "entrypoint" => entrypoint.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_snapshot(provider: &str) {
    counter!("gateway_snapshots_total", "provider" => provider.to_string()).increment(1);
}

/// `result` is one of `success`, `failure`, `skipped`.
pub fn record_reload(result: &'static str) {
    counter!("gateway_config_reloads_total", "result" => result).increment(1);
}

pub fn record_rate_limited(middleware: &str) {
    counter!("gateway_rate_limited_total", "middleware" => middleware.to_string()).increment(1);
}
