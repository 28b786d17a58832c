//! Metrics definitions for the Token Authority.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ta_` prefix for Token Authority
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `status`: 2 values (success, error)
//! - `error_category`: 8 values (see `TokenError::category`, plus `none`)
//! - `method`: HTTP methods
//! - `endpoint`: the fixed route table, everything else is `/other`
//!
//! Subjects, tokens and `jku` hosts are never used as labels.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("ta_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 3.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Key-set fetches are bounded by the client timeout (3s default)
        .set_buckets_for_metric(
            Matcher::Prefix("ta_jwks_fetch".to_string()),
            &[0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.000, 3.000, 5.000],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token issuance outcome
///
/// Metric: `ta_token_issuance_total`
/// Labels: `status`
pub fn record_token_issuance(status: &str) {
    counter!("ta_token_issuance_total", "status" => status.to_string()).increment(1);
}

/// Record token verification outcome
///
/// Metric: `ta_token_verifications_total`
/// Labels: `status`, `error_category`
pub fn record_token_verification(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("ta_token_verifications_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

/// Record remote key-set fetch duration
///
/// Metric: `ta_jwks_fetch_duration_seconds`
/// Labels: `status`
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("ta_jwks_fetch_duration_seconds", "status" => status.to_string())
        .record(duration.as_secs_f64());
}

// ============================================================================
// Login Metrics
// ============================================================================

/// Record login attempt outcome
///
/// Metric: `ta_login_attempts_total`
/// Labels: `status`
pub fn record_login_attempt(status: &str) {
    counter!("ta_login_attempts_total", "status" => status.to_string()).increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `ta_http_requests_total`, `ta_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status_code` / `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("ta_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("ta_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=399 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto the fixed route table.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/login" => "/login",
        "/logout" => "/logout",
        "/profile" => "/profile",
        "/power" => "/power",
        "/.well_know/jwks.json" => "/.well_know/jwks.json",
        "/healthz" => "/healthz",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}
