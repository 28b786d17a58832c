//! Integration tests for the operational endpoints.

use reqwest::StatusCode;
use ta_test_utils::TestTokenServer;

/// `/healthz` answers `{ "ok": true }`.
#[tokio::test]
async fn test_healthz_returns_ok() -> Result<(), anyhow::Error> {
    // Arrange
    let server = TestTokenServer::spawn().await?;

    // Act
    let response = reqwest::get(format!("{}/healthz", server.url())).await?;

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, serde_json::json!({ "ok": true }));

    Ok(())
}

/// `/metrics` is served without authentication.
#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    // Generate at least one request beforehand
    reqwest::get(format!("{}/healthz", server.url())).await?;
    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

/// Unknown paths are 404, not 401.
#[tokio::test]
async fn test_unknown_path_is_not_found() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    // The conventional spelling is not served
    let response = reqwest::get(format!("{}/.well-known/jwks.json", server.url())).await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    Ok(())
}
