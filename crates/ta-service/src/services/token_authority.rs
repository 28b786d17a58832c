//! Token Authority: issues RS256 tokens that advertise a `jku`, and
//! verifies tokens by fetching the key set their own `jku` names.
//!
//! # Verification steps
//!
//! 1. Peek the unverified header for `jku` and `kid`
//! 2. Parse `jku`, require `http`/`https`
//! 3. Check the host against the allow-list
//! 4. Fetch the key set (no caching, bounded by the client timeout)
//! 5. Select the key by `kid`, falling back to the first key
//! 6. Verify the RS256 signature and `exp`
//!
//! No network access happens before steps 1-3 succeed. Every failure is
//! terminal; callers must treat all of them as "unauthenticated".
//!
//! # Security
//!
//! Trusting a key set chosen by the token is the weakness this service
//! exists to demonstrate. Together with suffix allow-listing and the
//! first-key fallback, anyone who can serve a JSON file under an allowed
//! domain can mint accepted tokens.

use crate::config::Config;
use crate::crypto::{self, SigningKeyPair};
use crate::errors::TokenError;
use crate::models::{KeySet, TokenClaims};
use crate::observability::metrics::{record_token_issuance, record_token_verification};
use crate::services::key_set_fetcher::KeySetFetcher;
use crate::services::trust_policy::JkuTrustPolicy;
use common::jwt::peek_header;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Key identifier of the process signing key.
pub const SIGNING_KEY_ID: &str = "main";

/// Token lifetime (2 hours).
pub const TOKEN_LIFETIME_SECONDS: i64 = 7200;

/// Path the public key document is served under.
///
/// The spelling matches the links already handed out to players.
pub const JWKS_DISCOVERY_PATH: &str = "/.well_know/jwks.json";

/// Process-scoped issuer and verifier.
///
/// Built once in `main` and shared through `Arc`. Holds no mutable state.
pub struct TokenAuthority {
    signing_key: SigningKeyPair,
    base_url: Option<String>,
    policy: JkuTrustPolicy,
    fetcher: Arc<dyn KeySetFetcher>,
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("signing_key", &self.signing_key)
            .field("base_url", &self.base_url)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl TokenAuthority {
    /// Generate the RSA-2048 signing key and build the authority.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::KeyGeneration` if key generation fails. The
    /// process must not start without a key.
    #[instrument(skip_all, name = "ta.authority.initialize")]
    pub fn initialize(
        config: &Config,
        fetcher: Arc<dyn KeySetFetcher>,
    ) -> Result<Self, TokenError> {
        let signing_key = crypto::generate_signing_key(SIGNING_KEY_ID)?;

        tracing::info!(target: "ta.authority", kid = %signing_key.kid(), "Signing key generated");

        Ok(Self::with_signing_key(
            signing_key,
            config.base_url.clone(),
            JkuTrustPolicy::new(
                config.jku_allowed_hosts.clone(),
                config.jku_allowed_suffixes.clone(),
            ),
            fetcher,
        ))
    }

    /// Build an authority around an existing signing key.
    pub fn with_signing_key(
        signing_key: SigningKeyPair,
        base_url: Option<String>,
        policy: JkuTrustPolicy,
        fetcher: Arc<dyn KeySetFetcher>,
    ) -> Self {
        Self {
            signing_key,
            base_url,
            policy,
            fetcher,
        }
    }

    pub fn policy(&self) -> &JkuTrustPolicy {
        &self.policy
    }

    /// The published key document: `{ "keys": [ <public JWK> ] }`.
    pub fn public_key_document(&self) -> KeySet {
        KeySet {
            keys: vec![self.signing_key.public_jwk().clone()],
        }
    }

    /// URL of the public key document, placed in every issued token's `jku`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Configuration` when no base URL is configured.
    pub fn discovery_url(&self) -> Result<String, TokenError> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            TokenError::Configuration("BASE_URL must be set to sign tokens.".to_string())
        })?;

        Ok(format!("{}{}", base_url, JWKS_DISCOVERY_PATH))
    }

    /// Issue a token for `subject` with `role`, valid for two hours.
    #[instrument(skip_all, name = "ta.authority.issue")]
    pub fn issue(&self, subject: &str, role: &str) -> Result<String, TokenError> {
        self.issue_at(subject, role, chrono::Utc::now().timestamp())
    }

    /// Issue a token as if the current time were `issued_at`.
    pub fn issue_at(
        &self,
        subject: &str,
        role: &str,
        issued_at: i64,
    ) -> Result<String, TokenError> {
        let result = self.discovery_url().and_then(|jku| {
            let claims = TokenClaims {
                sub: subject.to_string(),
                role: role.to_string(),
                iat: Some(issued_at),
                exp: Some(issued_at + TOKEN_LIFETIME_SECONDS),
            };
            crypto::sign_jwt(&claims, &self.signing_key, &jku)
        });

        match &result {
            Ok(_) => record_token_issuance("success"),
            Err(e) => {
                tracing::warn!(target: "ta.authority", error = %e, "Token issuance failed");
                record_token_issuance("error");
            }
        }

        result
    }

    /// Verify a token against the key set named by its own `jku` header.
    #[instrument(skip_all, name = "ta.authority.verify")]
    pub async fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let result = self.verify_inner(token).await;

        match &result {
            Ok(_) => record_token_verification("success", None),
            Err(e) => {
                tracing::debug!(
                    target: "ta.authority",
                    error_category = e.category(),
                    error = %e,
                    "Token verification failed"
                );
                record_token_verification("error", Some(e.category()));
            }
        }

        result
    }

    async fn verify_inner(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let header = peek_header(token).map_err(|_| TokenError::MalformedToken)?;

        let jku = header.jku.ok_or(TokenError::MissingJku)?;

        let url = self.policy.check(&jku)?;

        let key_set = self.fetcher.fetch(&url).await?;

        let jwk = key_set.select(header.kid.as_deref())?;

        crypto::verify_jwt_with_jwk(token, jwk)
    }
}
