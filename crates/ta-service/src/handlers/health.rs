//! Liveness probe.

use crate::models::HealthResponse;
use axum::Json;

/// Returns `{ "ok": true }` while the process is serving requests.
///
/// Checks no dependencies.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}
