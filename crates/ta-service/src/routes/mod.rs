//! HTTP routes for the Token Authority.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{attach_user, http_metrics_middleware, require_auth, require_privileged_role};
use crate::services::{TokenAuthority, UserStore};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Issuer and verifier, holding the process signing key.
    pub authority: Arc<TokenAuthority>,

    /// Credential store for `/login`.
    pub users: Arc<UserStore>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` - Landing page model (public)
/// - `/login` - Login page model (GET) and credential check (POST)
/// - `/logout` - Clears the token cookie (POST)
/// - `/profile` - Caller's claims and token (authenticated)
/// - `/power` - Flag (authenticated, privileged role)
/// - `/.well_know/jwks.json` - Public key document (public)
/// - `/healthz` - Liveness probe (public)
/// - `/metrics` - Prometheus metrics endpoint (public)
/// - `attach_user` on every route
/// - TraceLayer for request logging
/// - 30 second request timeout
/// - HTTP metrics middleware (outermost)
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::handle_index))
        .route(
            "/login",
            get(handlers::handle_login_page).post(handlers::handle_login),
        )
        .route("/logout", post(handlers::handle_logout))
        .route("/.well_know/jwks.json", get(handlers::handle_get_jwks))
        .route("/healthz", get(handlers::health_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let authenticated_routes = Router::new()
        .route("/profile", get(handlers::handle_profile))
        .route_layer(middleware::from_fn(require_auth))
        .with_state(state.clone());

    // route_layer order: the last one added runs first
    let privileged_routes = Router::new()
        .route("/power", get(handlers::handle_power))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_privileged_role,
        ))
        .route_layer(middleware::from_fn(require_auth))
        .with_state(state.clone());

    // Layer order (bottom-to-top execution):
    // 1. attach_user - Resolve the caller before any gate runs
    // 2. TimeoutLayer - Bounds the request, including the key-set fetch
    // 3. TraceLayer - Log request details
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(authenticated_routes)
        .merge(privileged_routes)
        .layer(middleware::from_fn_with_state(state, attach_user))
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
