//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by operation, status,
//!   completion outcome
//! - `gateway_request_duration_seconds` (histogram): latency by operation

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics endpoint"),
    }
}

/// Record one finished request.
pub fn record_request(operation: &str, status: u16, outcome: &str, start: Instant) {
    counter!(
        "gateway_requests_total",
        "operation" => operation.to_string(),
        "status" => status.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);

    histogram!(
        "gateway_request_duration_seconds",
        "operation" => operation.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}
