use crate::errors::TokenError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token payload.
///
/// Issued tokens always carry every field. Verified payloads may omit any
/// of them: a missing `sub` or `role` reads as empty, and a token without
/// `exp` never expires. `sub` is redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: String, // Subject (username)

    #[serde(default)]
    pub role: String, // Role checked by role-gated pages

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>, // Issued at timestamp

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>, // Expiration timestamp
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &"[REDACTED]")
            .field("role", &self.role)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .finish()
    }
}

/// JSON Web Key (RFC 7517), RSA members only.
///
/// `kty` is the only required member; everything else is checked when the
/// key is imported for verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

/// JSON Web Key Set, both as published and as fetched from a `jku`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    pub keys: Vec<Jwk>,
}

impl KeySet {
    /// Parse a fetched body into a key set.
    ///
    /// The body must be a JSON object with a `keys` array whose entries are
    /// objects carrying a string `kty`; optional members must be strings
    /// when present.
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Pick the verification key for a token header `kid`.
    ///
    /// Returns the key whose `kid` matches; otherwise the first key in the
    /// set. The first-key fallback is intentionally weak: a forged set only
    /// needs one key to be used.
    pub fn select(&self, kid: Option<&str>) -> Result<&Jwk, TokenError> {
        if let Some(kid) = kid {
            if let Some(key) = self.keys.iter().find(|k| k.kid.as_deref() == Some(kid)) {
                return Ok(key);
            }
        }

        self.keys.first().ok_or(TokenError::EmptyKeySet)
    }
}

/// Login form (`application/x-www-form-urlencoded`).
///
/// Both fields may be missing; an incomplete form is rejected as invalid
/// credentials rather than as a malformed request.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    pub password: Option<common::secret::SecretString>,
}

/// Response for `GET /login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginPageResponse {
    pub error: Option<String>,
}

/// Response for `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct IndexResponse {
    pub user: Option<TokenClaims>,
}

/// Response for `GET /profile`.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub user: TokenClaims,
    pub token: Option<String>,
    pub jku: Option<String>,
}

/// Response for `GET /power`.
#[derive(Debug, Clone, Serialize)]
pub struct PowerResponse {
    pub flag: String,
    pub user: TokenClaims,
}

/// Response for `GET /healthz`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
}
