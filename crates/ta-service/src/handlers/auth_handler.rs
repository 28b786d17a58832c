use crate::errors::TaError;
use crate::middleware::auth::{token_cookie, CLEAR_TOKEN_COOKIE};
use crate::models::{LoginForm, LoginPageResponse};
use crate::observability::metrics::record_login_attempt;
use crate::routes::AppState;
use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Form, Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Login page model
///
/// GET /login
pub async fn handle_login_page() -> Json<LoginPageResponse> {
    Json(LoginPageResponse { error: None })
}

/// Handle login
///
/// POST /login
///
/// Checks the form credentials, issues a token and stores it in the
/// `token` cookie, then redirects to `/profile` (303).
#[instrument(name = "ta.auth.login", skip_all, fields(status))]
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, TaError> {
    let result = login(&state, form).await;

    let status = if result.is_ok() { "success" } else { "error" };
    tracing::Span::current().record("status", status);
    record_login_attempt(status);

    let token = result?;

    Ok((
        AppendHeaders([(SET_COOKIE, token_cookie(&token))]),
        Redirect::to("/profile"),
    )
        .into_response())
}

async fn login(state: &AppState, form: LoginForm) -> Result<String, TaError> {
    let users = Arc::clone(&state.users);
    let LoginForm { username, password } = form;
    let password = password.ok_or(TaError::InvalidCredentials)?;

    // bcrypt is CPU-bound
    let (username, role) = tokio::task::spawn_blocking(move || {
        users
            .authenticate(&username, &password)
            .map(|role| (username, role))
    })
    .await
    .map_err(|e| TaError::Internal(format!("Login task failed: {}", e)))??;

    Ok(state.authority.issue(&username, &role)?)
}

/// Handle logout
///
/// POST /logout
///
/// Clears the token cookie and redirects to `/` (303).
#[instrument(name = "ta.auth.logout", skip_all)]
pub async fn handle_logout() -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, CLEAR_TOKEN_COOKIE)]),
        Redirect::to("/"),
    )
}
