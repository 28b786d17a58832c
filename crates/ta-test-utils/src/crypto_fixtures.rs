//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible RSA-2048 keypairs. Generation is slow, so the two
//! well-known keys are generated once per test process and cached.

use rand::{rngs::StdRng, SeedableRng};
use rsa::RsaPrivateKey;
use std::sync::OnceLock;
use ta_service::crypto::{self, SigningKeyPair, RSA_KEY_BITS};
use ta_service::models::{Jwk, KeySet};
use ta_service::services::token_authority::SIGNING_KEY_ID;

/// Seed of the key the test server signs with.
pub const AUTHORITY_KEY_SEED: u64 = 1;

/// Seed of the key forged tokens are signed with.
pub const ATTACKER_KEY_SEED: u64 = 666;

/// Generate a deterministic RSA-2048 key for testing.
///
/// The same seed always produces the same key. Prefer the cached
/// [`authority_rsa_key`] and [`attacker_rsa_key`].
///
/// This is a test-only utility. Production keys come from the OS CSPRNG.
pub fn test_rsa_key(seed: u64) -> RsaPrivateKey {
    let mut rng = StdRng::seed_from_u64(seed);
    RsaPrivateKey::new(&mut rng, RSA_KEY_BITS).expect("RSA test key generation should succeed")
}

/// The test server's signing key.
pub fn authority_rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| test_rsa_key(AUTHORITY_KEY_SEED))
}

/// A key the server has never seen.
pub fn attacker_rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| test_rsa_key(ATTACKER_KEY_SEED))
}

/// The test server's signing key pair (`kid = "main"`).
pub fn authority_signing_key() -> SigningKeyPair {
    crypto::signing_key_from_rsa(authority_rsa_key(), SIGNING_KEY_ID)
        .expect("authority signing key should encode")
}

/// Public JWK of the attacker key under `kid`.
pub fn attacker_jwk(kid: &str) -> Jwk {
    crypto::rsa_public_jwk(&attacker_rsa_key().to_public_key(), kid)
}

/// One-key set holding the attacker's public key.
pub fn attacker_key_set(kid: &str) -> KeySet {
    KeySet {
        keys: vec![attacker_jwk(kid)],
    }
}

/// Serialize a key set the way a key-set endpoint would serve it.
pub fn key_set_json(key_set: &KeySet) -> serde_json::Value {
    serde_json::to_value(key_set).expect("key set should serialize")
}
