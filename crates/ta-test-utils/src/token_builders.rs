//! Builders for tokens the Token Authority did not issue.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::EncodeRsaPrivateKey;
use serde_json::{json, Map, Value};

use crate::crypto_fixtures::attacker_rsa_key;

/// Builder for attacker-signed RS256 tokens with arbitrary header and
/// payload.
///
/// Defaults: `sub = "mallory"`, `role = "uchiha"`, `iat` now, `exp` two
/// hours from now, no `jku`, no `kid`.
///
/// # Example
/// ```rust,ignore
/// let token = ForgedTokenBuilder::new()
///     .jku(&format!("{}/jwks.json", mock_server.uri()))
///     .kid("main")
///     .without_time_claims()
///     .build();
/// ```
pub struct ForgedTokenBuilder {
    payload: Map<String, Value>,
    jku: Option<String>,
    kid: Option<String>,
}

impl Default for ForgedTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ForgedTokenBuilder {
    pub fn new() -> Self {
        let now = chrono::Utc::now().timestamp();
        let mut payload = Map::new();
        payload.insert("sub".to_string(), json!("mallory"));
        payload.insert("role".to_string(), json!("uchiha"));
        payload.insert("iat".to_string(), json!(now));
        payload.insert("exp".to_string(), json!(now + 7200));

        Self {
            payload,
            jku: None,
            kid: None,
        }
    }

    pub fn subject(self, sub: &str) -> Self {
        self.claim("sub", json!(sub))
    }

    pub fn role(self, role: &str) -> Self {
        self.claim("role", json!(role))
    }

    pub fn jku(mut self, jku: &str) -> Self {
        self.jku = Some(jku.to_string());
        self
    }

    pub fn kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    /// Set any payload member, replacing a previous value.
    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.payload.insert(name.to_string(), value);
        self
    }

    /// Remove a payload member.
    pub fn without(mut self, name: &str) -> Self {
        self.payload.remove(name);
        self
    }

    /// Drop `iat` and `exp`, leaving a token that never expires.
    pub fn without_time_claims(self) -> Self {
        self.without("iat").without("exp")
    }

    /// Set `exp` to one minute ago.
    pub fn expired(self) -> Self {
        let now = chrono::Utc::now().timestamp();
        self.claim("iat", json!(now - 7260)).claim("exp", json!(now - 60))
    }

    pub fn build(self) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.jku = self.jku;
        header.kid = self.kid;

        let der = attacker_rsa_key()
            .to_pkcs1_der()
            .expect("test key should encode as PKCS#1");

        encode(
            &header,
            &Value::Object(self.payload),
            &EncodingKey::from_rsa_der(der.as_bytes()),
        )
        .expect("forged token should sign")
    }
}
