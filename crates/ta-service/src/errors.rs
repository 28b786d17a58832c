//! Token Authority error types.
//!
//! `TokenError` is the verification taxonomy returned by the core.
//! `UserError` covers the credential store.
//! `TaError` is what HTTP handlers return; its responses never say which
//! verification step failed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures of token issuance and verification.
///
/// Each variant belongs to one category (see [`TokenError::category`]).
/// Callers must treat every variant as "unauthenticated".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Token header could not be decoded")]
    MalformedToken,

    #[error("Missing jku header")]
    MissingJku,

    #[error("Invalid jku URL")]
    MalformedJkuUrl,

    #[error("Unsupported jku protocol: {0}")]
    UnsupportedScheme(String),

    #[error("Untrusted jku host: {0}")]
    UntrustedHost(String),

    #[error("Key set fetch failed: {0}")]
    Fetch(String),

    #[error("JWKS is empty")]
    EmptyKeySet,

    #[error("Key import failed: {0}")]
    KeyImport(String),

    #[error("Token signature invalid: {0}")]
    InvalidSignature(String),

    #[error("Token expired")]
    Expired,

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),
}

impl TokenError {
    /// Category tag used for logs and metrics labels.
    ///
    /// Bounded to seven values.
    pub fn category(&self) -> &'static str {
        match self {
            TokenError::Configuration(_) => "configuration",
            TokenError::MalformedToken | TokenError::MissingJku => "header",
            TokenError::MalformedJkuUrl | TokenError::UnsupportedScheme(_) => "url",
            TokenError::UntrustedHost(_) => "trust",
            TokenError::Fetch(_) => "fetch",
            TokenError::EmptyKeySet => "key_selection",
            TokenError::KeyImport(_)
            | TokenError::InvalidSignature(_)
            | TokenError::Expired
            | TokenError::Signing(_)
            | TokenError::KeyGeneration(_) => "signature",
        }
    }
}

/// Failures of the in-memory credential store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Random generation failed")]
    RandomUnavailable,
}

/// HTTP-facing error type.
///
/// Maps to:
/// - Unauthenticated, InvalidCredentials: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum TaError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden: role {required} required")]
    Forbidden { required: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TaError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            TaError::Unauthenticated | TaError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            TaError::Forbidden { .. } => StatusCode::FORBIDDEN,
            TaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for TaError {
    fn from(err: TokenError) -> Self {
        TaError::Internal(err.to_string())
    }
}

impl From<UserError> for TaError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::InvalidCredentials => TaError::InvalidCredentials,
            other => TaError::Internal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for TaError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message) = match &self {
            TaError::Unauthenticated => ("UNAUTHENTICATED", "Please log in to continue.".to_string()),
            TaError::InvalidCredentials => ("INVALID_CREDENTIALS", "Invalid credentials.".to_string()),
            TaError::Forbidden { required } => (
                "FORBIDDEN",
                format!("This page requires the {} role.", required),
            ),
            TaError::Internal(reason) => {
                tracing::error!(target: "ta.errors", reason = %reason, "Internal error");
                ("INTERNAL_ERROR", "An internal error occurred".to_string())
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"binding-force\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}
