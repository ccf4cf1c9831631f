//! Metrics collection and exposition.
//!
//! # Metrics
//! - `extract_cn_requests_total` (counter): requests seen by the filter,
//!   labelled by `outcome` (`injected`, `absent`, `malformed`, `no_match`,
//!   `invalid_value`)

use metrics::counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_extraction(outcome: &'static str) {
    counter!("extract_cn_requests_total", "outcome" => outcome).increment(1);
}
