//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define load balancer metrics
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `incoming_tcp_connections_total` (counter): inbound TCP connections accepted
//! - `incoming_tcp_connection_errors_total` (counter): failed backend dials in TCP mode
//! - `num_targets` (gauge): configured target count
//! - `num_healthy_targets` (gauge): healthy targets after the latest health cycle
//!
//! # Design Decisions
//! - Fire-and-forget: recording never fails and is a no-op without an exporter
//! - No labels; the pool is a single flat set of targets

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

const TCP_CONNECTIONS: &str = "incoming_tcp_connections_total";
const TCP_CONNECTION_ERRORS: &str = "incoming_tcp_connection_errors_total";
const NUM_TARGETS: &str = "num_targets";
const NUM_HEALTHY_TARGETS: &str = "num_healthy_targets";

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_counter!(TCP_CONNECTIONS, "The total number of incoming tcp connections");
    metrics::describe_counter!(
        TCP_CONNECTION_ERRORS,
        "The total number of tcp connection errors to targets"
    );
    metrics::describe_gauge!(NUM_TARGETS, "The number of configured targets");
    metrics::describe_gauge!(NUM_HEALTHY_TARGETS, "The number of healthy targets");

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_tcp_connection() {
    metrics::counter!(TCP_CONNECTIONS).increment(1);
}

pub fn record_backend_dial_error() {
    metrics::counter!(TCP_CONNECTION_ERRORS).increment(1);
}

pub fn set_num_targets(count: usize) {
    metrics::gauge!(NUM_TARGETS).set(count as f64);
}

pub fn set_healthy_targets(count: usize) {
    metrics::gauge!(NUM_HEALTHY_TARGETS).set(count as f64);
}
