use crate::errors::TokenError;
use crate::models::{Jwk, TokenClaims};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::rngs::OsRng;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use tracing::instrument;

/// RSA modulus size for the process signing key.
pub const RSA_KEY_BITS: usize = 2048;

/// Signing algorithm; also the only algorithm accepted at verification.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// RSA signing key pair held for the whole process lifetime.
///
/// The private half only exists as a `jsonwebtoken` encoding key and is
/// never serialized. Debug output redacts it.
#[derive(Clone)]
pub struct SigningKeyPair {
    kid: String,
    encoding_key: EncodingKey,
    public_jwk: Jwk,
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("kid", &self.kid)
            .field("encoding_key", &"[REDACTED]")
            .field("public_jwk", &self.public_jwk)
            .finish()
    }
}

impl SigningKeyPair {
    /// Key identifier placed in token headers and the published JWK.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Public half as a JWK (`use=sig`, `alg=RS256`).
    pub fn public_jwk(&self) -> &Jwk {
        &self.public_jwk
    }
}

/// Generate an RSA-2048 signing key pair from the OS CSPRNG.
#[instrument(skip_all)]
pub fn generate_signing_key(kid: &str) -> Result<SigningKeyPair, TokenError> {
    let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
        .map_err(|e| TokenError::KeyGeneration(format!("RSA keypair generation failed: {}", e)))?;

    signing_key_from_rsa(&private_key, kid)
}

/// Wrap an existing RSA private key as the signing key pair.
#[instrument(skip_all)]
pub fn signing_key_from_rsa(
    private_key: &RsaPrivateKey,
    kid: &str,
) -> Result<SigningKeyPair, TokenError> {
    let der = private_key
        .to_pkcs1_der()
        .map_err(|e| TokenError::KeyGeneration(format!("PKCS#1 encoding failed: {}", e)))?;
    let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());

    Ok(SigningKeyPair {
        kid: kid.to_string(),
        encoding_key,
        public_jwk: rsa_public_jwk(&private_key.to_public_key(), kid),
    })
}

/// Export an RSA public key as a signing JWK.
pub fn rsa_public_jwk(public_key: &RsaPublicKey, kid: &str) -> Jwk {
    Jwk {
        kty: "RSA".to_string(),
        kid: Some(kid.to_string()),
        key_use: Some("sig".to_string()),
        alg: Some("RS256".to_string()),
        n: Some(URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be())),
        e: Some(URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be())),
    }
}

/// Sign claims with RS256, advertising `kid` and `jku` in the header.
#[instrument(skip_all)]
pub fn sign_jwt(
    claims: &TokenClaims,
    key: &SigningKeyPair,
    jku: &str,
) -> Result<String, TokenError> {
    let mut header = Header::new(SIGNING_ALGORITHM);
    header.typ = Some("JWT".to_string());
    header.kid = Some(key.kid.clone());
    header.jku = Some(jku.to_string());

    encode(&header, claims, &key.encoding_key)
        .map_err(|e| TokenError::Signing(format!("JWT signing operation failed: {}", e)))
}

/// Verify an RS256 token against a JWK and return its claims.
///
/// Validates:
/// - JWK is an RSA key with `n` and `e`
/// - Header algorithm is RS256 (anything else is rejected)
/// - Signature
/// - `exp` and `nbf` when present, with zero leeway
///
/// No claim is required and `aud` is not checked. A token whose `exp`
/// equals the current second is already expired.
#[instrument(skip_all)]
pub fn verify_jwt_with_jwk(token: &str, jwk: &Jwk) -> Result<TokenClaims, TokenError> {
    let decoding_key = import_rsa_jwk(jwk)?;

    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.required_spec_claims.clear();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.validate_aud = false;
    validation.leeway = 0;

    let token_data = decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "ta.crypto", error = %e, "Token verification failed");
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::InvalidSignature(e.to_string()),
        }
    })?;

    // jsonwebtoken only rejects `exp < now`
    if token_data
        .claims
        .exp
        .is_some_and(|exp| exp <= chrono::Utc::now().timestamp())
    {
        tracing::debug!(target: "ta.crypto", "Token expires this second");
        return Err(TokenError::Expired);
    }

    Ok(token_data.claims)
}

/// Import a JWK as an RSA verification key.
fn import_rsa_jwk(jwk: &Jwk) -> Result<DecodingKey, TokenError> {
    if jwk.kty != "RSA" {
        tracing::debug!(target: "ta.crypto", kty = %jwk.kty, "Unexpected JWK key type");
        return Err(TokenError::KeyImport(format!(
            "unsupported key type {}",
            jwk.kty
        )));
    }

    let n = jwk
        .n
        .as_deref()
        .ok_or_else(|| TokenError::KeyImport("JWK missing n".to_string()))?;
    let e = jwk
        .e
        .as_deref()
        .ok_or_else(|| TokenError::KeyImport("JWK missing e".to_string()))?;

    DecodingKey::from_rsa_components(n, e)
        .map_err(|err| TokenError::KeyImport(format!("invalid RSA components: {}", err)))
}
