use crate::models::KeySet;
use crate::routes::AppState;
use axum::{
    extract::State,
    http::header::{HeaderMap, HeaderValue, CACHE_CONTROL},
    Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handle public key document request
///
/// GET /.well_know/jwks.json
///
/// Returns the process signing key as a one-key JWKS (RFC 7517). The key
/// lives for the process lifetime, so clients may cache for an hour.
#[instrument(name = "ta.jwks.get", skip_all)]
pub async fn handle_get_jwks(State(state): State<Arc<AppState>>) -> (HeaderMap, Json<KeySet>) {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=3600"));

    (headers, Json(state.authority.public_key_document()))
}
