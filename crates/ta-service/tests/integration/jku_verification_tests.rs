//! Integration tests for `jku` verification over real HTTP.
//!
//! Key sets are served by wiremock on 127.0.0.1; the authority fetches them
//! with the production `HttpKeySetFetcher`.

use std::sync::Arc;
use std::time::Duration;
use ta_service::errors::TokenError;
use ta_service::models::KeySet;
use ta_service::services::{HttpKeySetFetcher, JkuTrustPolicy, TokenAuthority};
use ta_test_utils::{attacker_key_set, authority_signing_key, key_set_json, ForgedTokenBuilder};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JWKS_PATH: &str = "/.well_know/jwks.json";

fn authority(base_url: &str, trusted_hosts: &[&str], timeout: Duration) -> TokenAuthority {
    TokenAuthority::with_signing_key(
        authority_signing_key(),
        Some(base_url.to_string()),
        JkuTrustPolicy::new(
            trusted_hosts.iter().map(|h| h.to_string()).collect(),
            vec![".google.com".to_string()],
        ),
        Arc::new(HttpKeySetFetcher::new(timeout).expect("fetcher should build")),
    )
}

fn local_authority(base_url: &str) -> TokenAuthority {
    authority(base_url, &["localhost", "127.0.0.1"], Duration::from_secs(3))
}

async fn serve_key_set(server: &MockServer, key_set: &KeySet, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(key_set_json(key_set)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

// ============================================================================
// Genuine tokens
// ============================================================================

#[tokio::test]
async fn test_issue_verify_round_trip() -> Result<(), anyhow::Error> {
    // Arrange: the mock serves the authority's own document at its discovery URL
    let server = MockServer::start().await;
    let authority = local_authority(&server.uri());
    serve_key_set(&server, &authority.public_key_document(), 1).await;

    // Act
    let token = authority.issue("alice", "admin")?;
    let claims = authority.verify(&token).await?;

    // Assert
    assert_eq!(claims.sub, "alice");
    assert_eq!(claims.role, "admin");
    assert_eq!(claims.exp.zip(claims.iat).map(|(exp, iat)| exp - iat), Some(7200));

    Ok(())
}

#[tokio::test]
async fn test_expired_genuine_token_rejected() -> Result<(), anyhow::Error> {
    let server = MockServer::start().await;
    let authority = local_authority(&server.uri());
    serve_key_set(&server, &authority.public_key_document(), 1).await;

    let issued_at = chrono::Utc::now().timestamp() - 7200 - 5;
    let token = authority.issue_at("alice", "admin", issued_at)?;

    assert_eq!(authority.verify(&token).await, Err(TokenError::Expired));

    Ok(())
}

// ============================================================================
// Forged tokens
// ============================================================================

/// A forged set on a trusted host is accepted: the kid does not match, so
/// the first (attacker) key is used.
#[tokio::test]
async fn test_forged_key_set_on_trusted_host_is_accepted() -> Result<(), anyhow::Error> {
    let server = MockServer::start().await;
    serve_key_set(&server, &attacker_key_set("attacker"), 1).await;
    let authority = local_authority("http://localhost:3000");

    let token = ForgedTokenBuilder::new()
        .subject("mallory")
        .role("uchiha")
        .jku(&format!("{}{}", server.uri(), JWKS_PATH))
        .kid("main")
        .build();

    let claims = authority.verify(&token).await?;
    assert_eq!(claims.sub, "mallory");
    assert_eq!(claims.role, "uchiha");

    Ok(())
}

#[tokio::test]
async fn test_untrusted_host_is_never_fetched() -> Result<(), anyhow::Error> {
    let server = MockServer::start().await;
    serve_key_set(&server, &attacker_key_set("main"), 0).await;
    // 127.0.0.1 is not trusted here
    let authority = authority(
        "http://localhost:3000",
        &["localhost"],
        Duration::from_secs(3),
    );

    let token = ForgedTokenBuilder::new()
        .jku(&format!("{}{}", server.uri(), JWKS_PATH))
        .build();

    assert_eq!(
        authority.verify(&token).await,
        Err(TokenError::UntrustedHost("127.0.0.1".to_string()))
    );

    Ok(())
}

#[tokio::test]
async fn test_file_scheme_rejected_before_fetch() -> Result<(), anyhow::Error> {
    let authority = local_authority("http://localhost:3000");

    let token = ForgedTokenBuilder::new().jku("file:///etc/passwd").build();

    assert_eq!(
        authority.verify(&token).await,
        Err(TokenError::UnsupportedScheme("file".to_string()))
    );

    Ok(())
}

#[tokio::test]
async fn test_missing_jku_rejected() -> Result<(), anyhow::Error> {
    let authority = local_authority("http://localhost:3000");

    let token = ForgedTokenBuilder::new().kid("main").build();

    assert_eq!(authority.verify(&token).await, Err(TokenError::MissingJku));

    Ok(())
}

#[tokio::test]
async fn test_token_signed_by_other_key_rejected() -> Result<(), anyhow::Error> {
    // The set holds the authority key; the token is signed by the attacker
    let server = MockServer::start().await;
    let authority = local_authority(&server.uri());
    serve_key_set(&server, &authority.public_key_document(), 1).await;

    let token = ForgedTokenBuilder::new()
        .jku(&format!("{}{}", server.uri(), JWKS_PATH))
        .kid("main")
        .build();

    let err = authority.verify(&token).await.unwrap_err();
    assert!(matches!(err, TokenError::InvalidSignature(_)), "{:?}", err);

    Ok(())
}

#[tokio::test]
async fn test_expired_forged_token_rejected() -> Result<(), anyhow::Error> {
    let server = MockServer::start().await;
    serve_key_set(&server, &attacker_key_set("main"), 1).await;
    let authority = local_authority("http://localhost:3000");

    let token = ForgedTokenBuilder::new()
        .jku(&format!("{}{}", server.uri(), JWKS_PATH))
        .kid("main")
        .expired()
        .build();

    assert_eq!(authority.verify(&token).await, Err(TokenError::Expired));

    Ok(())
}

// ============================================================================
// Key-set failures
// ============================================================================

#[tokio::test]
async fn test_empty_key_set_rejected() -> Result<(), anyhow::Error> {
    let server = MockServer::start().await;
    serve_key_set(&server, &KeySet { keys: vec![] }, 1).await;
    let authority = local_authority("http://localhost:3000");

    let token = ForgedTokenBuilder::new()
        .jku(&format!("{}{}", server.uri(), JWKS_PATH))
        .build();

    assert_eq!(authority.verify(&token).await, Err(TokenError::EmptyKeySet));

    Ok(())
}

#[tokio::test]
async fn test_non_success_status_is_fetch_error() -> Result<(), anyhow::Error> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let authority = local_authority("http://localhost:3000");

    let token = ForgedTokenBuilder::new()
        .jku(&format!("{}{}", server.uri(), JWKS_PATH))
        .build();

    assert_eq!(
        authority.verify(&token).await,
        Err(TokenError::Fetch("unexpected status 404".to_string()))
    );

    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_fetch_error() -> Result<(), anyhow::Error> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "keys": "nope" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let authority = local_authority("http://localhost:3000");

    let token = ForgedTokenBuilder::new()
        .jku(&format!("{}{}", server.uri(), JWKS_PATH))
        .build();

    assert_eq!(
        authority.verify(&token).await,
        Err(TokenError::Fetch("Invalid JWKS format".to_string()))
    );

    Ok(())
}

#[tokio::test]
async fn test_slow_key_set_times_out() -> Result<(), anyhow::Error> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(key_set_json(&attacker_key_set("main")))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let authority = authority(
        "http://localhost:3000",
        &["127.0.0.1"],
        Duration::from_millis(200),
    );

    let token = ForgedTokenBuilder::new()
        .jku(&format!("{}{}", server.uri(), JWKS_PATH))
        .build();

    assert_eq!(
        authority.verify(&token).await,
        Err(TokenError::Fetch("request timed out".to_string()))
    );

    Ok(())
}

// ============================================================================
// Forged payload shapes
// ============================================================================

async fn verify_forged(
    shape: impl FnOnce(ForgedTokenBuilder) -> ForgedTokenBuilder,
) -> Result<ta_service::models::TokenClaims, TokenError> {
    let server = MockServer::start().await;
    serve_key_set(&server, &attacker_key_set("main"), 1).await;
    let authority = local_authority("http://localhost:3000");

    let token = shape(
        ForgedTokenBuilder::new()
            .jku(&format!("{}{}", server.uri(), JWKS_PATH))
            .kid("main"),
    )
    .build();

    authority.verify(&token).await
}

#[tokio::test]
async fn test_forged_payload_with_only_sub_and_role_is_accepted() -> Result<(), anyhow::Error> {
    let claims = verify_forged(|b| b.without_time_claims()).await?;

    assert_eq!(claims.sub, "mallory");
    assert_eq!(claims.role, "uchiha");
    assert!(claims.iat.is_none());
    assert!(claims.exp.is_none());

    Ok(())
}

#[tokio::test]
async fn test_forged_payload_without_iat_is_accepted() -> Result<(), anyhow::Error> {
    let claims = verify_forged(|b| b.without("iat")).await?;

    assert_eq!(claims.role, "uchiha");
    assert!(claims.iat.is_none());
    assert!(claims.exp.is_some());

    Ok(())
}

#[tokio::test]
async fn test_forged_payload_with_audience_is_accepted() -> Result<(), anyhow::Error> {
    let claims = verify_forged(|b| b.claim("aud", serde_json::json!("some-other-service"))).await?;

    assert_eq!(claims.role, "uchiha");

    Ok(())
}

#[tokio::test]
async fn test_forged_payload_with_only_role_is_accepted() -> Result<(), anyhow::Error> {
    let claims = verify_forged(|b| b.without_time_claims().without("sub")).await?;

    assert_eq!(claims.sub, "");
    assert_eq!(claims.role, "uchiha");

    Ok(())
}

#[tokio::test]
async fn test_forged_payload_expiring_now_is_rejected() -> Result<(), anyhow::Error> {
    let now = chrono::Utc::now().timestamp();

    let result = verify_forged(|b| b.claim("exp", serde_json::json!(now))).await;

    assert_eq!(result, Err(TokenError::Expired));

    Ok(())
}

#[tokio::test]
async fn test_forged_payload_not_yet_valid_is_rejected() -> Result<(), anyhow::Error> {
    let now = chrono::Utc::now().timestamp();

    let result = verify_forged(|b| b.claim("nbf", serde_json::json!(now + 600))).await;

    assert!(matches!(result, Err(TokenError::InvalidSignature(_))), "{:?}", result);

    Ok(())
}
