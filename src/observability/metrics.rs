//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fixture_http_requests_total` (counter): requests by path, status
//! - `fixture_registry_operations_total` (counter): registry calls by operation, outcome
//! - `fixture_certificates_issued_total` (counter): certificates minted
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`. Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter"),
    }
}

pub fn record_request(path: &str, status: u16) {
    metrics::counter!(
        "fixture_http_requests_total",
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_registry_operation(operation: &'static str, outcome: &'static str) {
    metrics::counter!(
        "fixture_registry_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_certificate_issued() {
    metrics::counter!("fixture_certificates_issued_total").increment(1);
}
