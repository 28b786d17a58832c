//! Token-attaching and gating middleware.
//!
//! - `attach_user` - runs on every route; verifies the presented token and
//!   stores `CurrentUser` in request extensions, or proceeds anonymously
//!   and clears the token cookie
//! - `require_auth` - 401 unless `attach_user` found a user
//! - `require_privileged_role` - 403 unless the user holds the configured
//!   privileged role
//!
//! The token is read from `Authorization: Bearer <token>` first, then from
//! the `token` cookie.

use crate::errors::TaError;
use crate::models::TokenClaims;
use crate::routes::AppState;
use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

/// Cookie carrying the session token.
pub const TOKEN_COOKIE: &str = "token";

/// `Set-Cookie` value that removes the token cookie.
pub const CLEAR_TOKEN_COOKIE: &str = "token=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT";

/// `Set-Cookie` value storing a freshly issued token.
pub fn token_cookie(token: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", TOKEN_COOKIE, token)
}

/// Verified user attached to the request by `attach_user`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub claims: TokenClaims,
    /// The raw token the claims were verified from.
    pub token: String,
}

/// Extract the presented token.
///
/// An `Authorization: Bearer` header takes precedence over the cookie even
/// when its value is blank, in which case no token is presented.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        let token = bearer.trim();
        return (!token.is_empty()).then(|| token.to_string());
    }

    cookie_value(headers, TOKEN_COOKIE)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Find a cookie by name across all `Cookie` headers.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

/// Whether the response already sets the token cookie.
fn sets_token_cookie(response: &Response) -> bool {
    let prefix = format!("{}=", TOKEN_COOKIE);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .any(|h| h.starts_with(&prefix))
}

/// Attach the verified user, if any, to the request.
///
/// Never rejects. A token that fails verification for any reason is
/// treated as absent and the cookie is cleared on the way out, unless the
/// handler itself set a new one.
#[instrument(skip_all, name = "ta.middleware.attach_user")]
pub async fn attach_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_token(req.headers()) else {
        return next.run(req).await;
    };

    match state.authority.verify(&token).await {
        Ok(claims) => {
            req.extensions_mut().insert(CurrentUser { claims, token });
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(
                target: "ta.middleware.auth",
                error_category = e.category(),
                "Presented token rejected, continuing anonymously"
            );

            let mut response = next.run(req).await;
            if !sets_token_cookie(&response) {
                response
                    .headers_mut()
                    .append(SET_COOKIE, HeaderValue::from_static(CLEAR_TOKEN_COOKIE));
            }
            response
        }
    }
}

/// Reject anonymous requests with 401.
#[instrument(skip_all, name = "ta.middleware.require_auth")]
pub async fn require_auth(req: Request, next: Next) -> Result<impl IntoResponse, TaError> {
    if req.extensions().get::<CurrentUser>().is_none() {
        tracing::debug!(target: "ta.middleware.auth", "No authenticated user");
        return Err(TaError::Unauthenticated);
    }

    Ok(next.run(req).await)
}

/// Check that `user` holds `role`.
pub fn check_role(user: Option<&CurrentUser>, role: &str) -> Result<(), TaError> {
    match user {
        Some(user) if user.claims.role == role => Ok(()),
        _ => Err(TaError::Forbidden {
            required: role.to_string(),
        }),
    }
}

/// Reject requests whose user lacks the configured privileged role with 403.
#[instrument(skip_all, name = "ta.middleware.require_role")]
pub async fn require_privileged_role(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<impl IntoResponse, TaError> {
    check_role(
        req.extensions().get::<CurrentUser>(),
        &state.config.privileged_role,
    )
    .inspect_err(|_| {
        tracing::debug!(target: "ta.middleware.auth", "Role check failed");
    })?;

    Ok(next.run(req).await)
}
