//! Prometheus metrics endpoint.
//!
//! Unauthenticated. Labels carry no subjects, tokens or `jku` values.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Render all recorded metrics in Prometheus text format.
///
/// GET /metrics
#[tracing::instrument(skip_all, name = "ta.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
