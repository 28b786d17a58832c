//! End-to-end HTTP flows against a spawned Token Authority.

use reqwest::{header, redirect::Policy, Client, StatusCode};
use ta_test_utils::{
    attacker_key_set, key_set_json, ForgedTokenBuilder, TestServerOptions, TestTokenServer,
    TEST_FLAG,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CLEAR_COOKIE: &str = "token=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT";

fn client() -> Client {
    Client::builder()
        .redirect(Policy::none())
        .build()
        .expect("client should build")
}

fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// Post the login form.
async fn login(server: &TestTokenServer, username: &str, password: &str) -> reqwest::Response {
    client()
        .post(format!("{}/login", server.url()))
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .expect("login request should complete")
}

fn token_from(response: &reqwest::Response) -> String {
    set_cookies(response)
        .iter()
        .find_map(|c| c.strip_prefix("token="))
        .and_then(|rest| rest.split(';').next())
        .expect("response should set the token cookie")
        .to_string()
}

// ============================================================================
// Login and logout
// ============================================================================

#[tokio::test]
async fn test_login_sets_cookie_and_redirects_to_profile() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let response = login(&server, "guest", "guest").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/profile"
    );
    let cookie = set_cookies(&response)
        .into_iter()
        .find(|c| c.starts_with("token="))
        .expect("token cookie should be set");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));

    Ok(())
}

#[tokio::test]
async fn test_profile_shows_claims_token_and_jku() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let token = token_from(&login(&server, "guest", "guest").await);

    let response = client()
        .get(format!("{}/profile", server.url()))
        .header(header::COOKIE, format!("token={}", token))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["user"]["sub"], "guest");
    assert_eq!(body["user"]["role"], "genin");
    assert_eq!(body["token"], token.as_str());
    assert_eq!(body["jku"], server.jwks_url().as_str());

    Ok(())
}

#[tokio::test]
async fn test_login_with_bad_credentials_is_unauthorized() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let response = login(&server, "guest", "wrong").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");

    Ok(())
}

#[tokio::test]
async fn test_login_with_unknown_user_is_unauthorized() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let response = login(&server, "itachi", "guest").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_login_with_incomplete_form_is_unauthorized() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    for form in [
        vec![("username", "guest")],
        vec![("password", "guest")],
        vec![],
    ] {
        let response = client()
            .post(format!("{}/login", server.url()))
            .form(&form)
            .send()
            .await?;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "form {:?}", form);
        let body: serde_json::Value = response.json().await?;
        assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
    }

    Ok(())
}

#[tokio::test]
async fn test_login_without_base_url_is_internal_error() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn_with(TestServerOptions {
        with_base_url: false,
        ..Default::default()
    })
    .await?;

    let response = login(&server, "guest", "guest").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");

    Ok(())
}

#[tokio::test]
async fn test_logout_clears_cookie_and_redirects_home() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let response = client()
        .post(format!("{}/logout", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    assert!(set_cookies(&response).contains(&CLEAR_COOKIE.to_string()));

    Ok(())
}

#[tokio::test]
async fn test_login_page_has_no_error() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let response = client()
        .get(format!("{}/login", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body, serde_json::json!({ "error": null }));

    Ok(())
}

// ============================================================================
// Pages
// ============================================================================

#[tokio::test]
async fn test_index_anonymous_and_authenticated() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let token = server.issue_token("alice", "admin")?;

    let anonymous: serde_json::Value = client()
        .get(format!("{}/", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(anonymous["user"], serde_json::Value::Null);

    let authenticated: serde_json::Value = client()
        .get(format!("{}/", server.url()))
        .header(header::COOKIE, format!("token={}", token))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(authenticated["user"]["sub"], "alice");

    Ok(())
}

#[tokio::test]
async fn test_profile_requires_login() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let response = client()
        .get(format!("{}/profile", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    assert_eq!(body["error"]["message"], "Please log in to continue.");

    Ok(())
}

#[tokio::test]
async fn test_bearer_header_authenticates() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let token = server.issue_token("guest", "genin")?;

    let response = client()
        .get(format!("{}/profile", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["user"]["sub"], "guest");

    Ok(())
}

#[tokio::test]
async fn test_power_forbidden_for_unprivileged_role() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let token = server.issue_token("guest", "genin")?;

    let response = client()
        .get(format!("{}/power", server.url()))
        .header(header::COOKIE, format!("token={}", token))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    Ok(())
}

#[tokio::test]
async fn test_power_anonymous_is_unauthorized() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let response = client()
        .get(format!("{}/power", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_power_serves_flag_to_privileged_role() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let token = server.issue_token("itachi", "uchiha")?;

    let response = client()
        .get(format!("{}/power", server.url()))
        .header(header::COOKIE, format!("token={}", token))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["flag"], TEST_FLAG);
    assert_eq!(body["user"]["sub"], "itachi");

    Ok(())
}

// ============================================================================
// Forged tokens
// ============================================================================

/// A key set hosted on a trusted host lets an attacker mint the privileged
/// role.
#[tokio::test]
async fn test_forged_token_via_trusted_host_reaches_flag() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let attacker = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwks.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(key_set_json(&attacker_key_set("evil"))),
        )
        .expect(1)
        .mount(&attacker)
        .await;

    let token = ForgedTokenBuilder::new()
        .subject("mallory")
        .role("uchiha")
        .jku(&format!("{}/jwks.json", attacker.uri()))
        .kid("main")
        .build();

    let response = client()
        .get(format!("{}/power", server.url()))
        .header(header::COOKIE, format!("token={}", token))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["flag"], TEST_FLAG);
    assert_eq!(body["user"]["sub"], "mallory");

    Ok(())
}

/// Solve scripts usually sign only `sub` and `role`.
#[tokio::test]
async fn test_forged_token_without_time_claims_reaches_flag() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;
    let attacker = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwks.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(key_set_json(&attacker_key_set("main"))),
        )
        .expect(1)
        .mount(&attacker)
        .await;

    let token = ForgedTokenBuilder::new()
        .subject("mallory")
        .role("uchiha")
        .without_time_claims()
        .jku(&format!("{}/jwks.json", attacker.uri()))
        .kid("main")
        .build();

    let response = client()
        .get(format!("{}/power", server.url()))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["flag"], TEST_FLAG);
    assert!(body["user"].get("exp").is_none());

    Ok(())
}

#[tokio::test]
async fn test_untrusted_jku_cookie_is_cleared() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let token = ForgedTokenBuilder::new()
        .role("uchiha")
        .jku("http://attacker.example.net/jwks.json")
        .build();

    let response = client()
        .get(format!("{}/profile", server.url()))
        .header(header::COOKIE, format!("token={}", token))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).contains(&CLEAR_COOKIE.to_string()));

    Ok(())
}

#[tokio::test]
async fn test_rejected_token_on_public_page_is_anonymous() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let response = client()
        .get(format!("{}/", server.url()))
        .header(header::COOKIE, "token=not-a-jwt")
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).contains(&CLEAR_COOKIE.to_string()));
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["user"], serde_json::Value::Null);

    Ok(())
}

#[tokio::test]
async fn test_jwks_publishes_public_key_only() -> Result<(), anyhow::Error> {
    let server = TestTokenServer::spawn().await?;

    let response = client().get(server.jwks_url()).send().await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["keys"][0]["kid"], "main");
    assert_eq!(body["keys"][0]["kty"], "RSA");
    assert_eq!(body["keys"][0]["alg"], "RS256");
    assert!(body["keys"][0].get("d").is_none());

    Ok(())
}
