//! Prometheus request metrics served at `/metrics`.

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};

/// Build the metrics middleware for the ledger namespace.
///
/// # Errors
///
/// Returns [`std::io::Error`] when the collectors cannot be registered.
pub fn build_metrics() -> std::io::Result<PrometheusMetrics> {
    PrometheusMetricsBuilder::new("ledger")
        .endpoint("/metrics")
        .build()
        .map_err(|err| std::io::Error::other(format!("metrics registration failed: {err}")))
}
