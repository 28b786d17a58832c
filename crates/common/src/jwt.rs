//! JWT header utilities shared by the token authority and its tests.
//!
//! A `jku` verifier has to read the protected header *before* it knows
//! which key to verify with, so this module decodes the header segment
//! without touching the signature.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Nothing returned here is trusted; the token MUST still be verified
//! - Empty `kid`/`jku` strings are reported as absent
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::peek_header;
//!
//! let header = peek_header(token)?;
//! let jku = header.jku.ok_or(MyError::MissingJku)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Larger tokens are rejected before any base64 decoding.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while peeking at a JWT header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtHeaderError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,
}

// =============================================================================
// Header Types
// =============================================================================

/// Protected header fields read without signature verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UnverifiedHeader {
    /// Declared signing algorithm.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key identifier used to select a key from the fetched set.
    #[serde(default)]
    pub kid: Option<String>,

    /// URL of the JWK Set the verifier is asked to trust.
    #[serde(default)]
    pub jku: Option<String>,
}

// =============================================================================
// Functions
// =============================================================================

/// Decode the protected header of a compact JWS without verifying it.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - wrong segment count, bad base64 or header JSON that
///   is not an object with string-valued `alg`/`kid`/`jku`
pub fn peek_header(token: &str) -> Result<UnverifiedHeader, JwtHeaderError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtHeaderError::TokenTooLarge);
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtHeaderError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtHeaderError::MalformedToken)?;
    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtHeaderError::MalformedToken
    })?;

    let mut header: UnverifiedHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtHeaderError::MalformedToken
    })?;

    header.kid = header.kid.filter(|s| !s.is_empty());
    header.jku = header.jku.filter(|s| !s.is_empty());

    Ok(header)
}

// =============================================================================
// Tests
// =============================================================================
