//! Page handlers. Pages answer with the JSON model a template would render.

use crate::middleware::CurrentUser;
use crate::models::{IndexResponse, PowerResponse, ProfileResponse};
use crate::routes::AppState;
use axum::{extract::State, Extension, Json};
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// GET /
pub async fn handle_index(user: Option<Extension<CurrentUser>>) -> Json<IndexResponse> {
    Json(IndexResponse {
        user: user.map(|Extension(u)| u.claims),
    })
}

/// Show the caller's claims, their raw token and the `jku` tokens are
/// issued with.
///
/// GET /profile (authenticated)
#[instrument(name = "ta.pages.profile", skip_all)]
pub async fn handle_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user: user.claims,
        token: Some(user.token),
        jku: state.authority.discovery_url().ok(),
    })
}

/// GET /power (authenticated, privileged role)
#[instrument(name = "ta.pages.power", skip_all)]
pub async fn handle_power(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Json<PowerResponse> {
    tracing::info!(target: "ta.pages", role = %user.claims.role, "Privileged page served");

    Json(PowerResponse {
        flag: state.config.flag.expose_secret().to_string(),
        user: user.claims,
    })
}
