//! Remote key-set retrieval for `jku` verification.
//!
//! The fetcher only ever receives URLs that already passed the trust
//! policy. Fetched sets are not cached: every verification performs one GET.

use crate::errors::TokenError;
use crate::models::KeySet;
use crate::observability::metrics::record_jwks_fetch;
use std::time::{Duration, Instant};
use tracing::instrument;
use url::Url;

/// Trait for key-set fetch operations (enables mocking).
#[async_trait::async_trait]
pub trait KeySetFetcher: Send + Sync {
    /// Fetch and parse the key set served at `url`.
    ///
    /// Any transport failure, timeout, non-2xx status or malformed body is
    /// reported as `TokenError::Fetch`.
    async fn fetch(&self, url: &Url) -> Result<KeySet, TokenError>;
}

/// HTTP fetcher backed by a shared `reqwest` client with a request timeout.
#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    http_client: reqwest::Client,
}

impl HttpKeySetFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TokenError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!(target: "ta.jwks.fetch", error = %e, "Failed to build HTTP client");
                TokenError::Configuration(format!("HTTP client build failed: {}", e))
            })?;

        Ok(Self { http_client })
    }

    async fn fetch_inner(&self, url: &Url) -> Result<KeySet, TokenError> {
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::debug!(target: "ta.jwks.fetch", "Key set request timed out");
                    TokenError::Fetch("request timed out".to_string())
                } else {
                    tracing::debug!(target: "ta.jwks.fetch", error = %e, "Key set request failed");
                    TokenError::Fetch("request failed".to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(target: "ta.jwks.fetch", status = %status, "Key set endpoint returned error");
            return Err(TokenError::Fetch(format!("unexpected status {}", status.as_u16())));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TokenError::Fetch("request timed out".to_string())
            } else {
                tracing::debug!(target: "ta.jwks.fetch", error = %e, "Failed to read key set body");
                TokenError::Fetch("body read failed".to_string())
            }
        })?;

        KeySet::parse(&body).map_err(|e| {
            tracing::debug!(target: "ta.jwks.fetch", error = %e, "Key set body is not a JWKS");
            TokenError::Fetch("Invalid JWKS format".to_string())
        })
    }
}

#[async_trait::async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    #[instrument(skip_all, name = "ta.jwks.fetch")]
    async fn fetch(&self, url: &Url) -> Result<KeySet, TokenError> {
        let start = Instant::now();
        let result = self.fetch_inner(url).await;

        let status = if result.is_ok() { "success" } else { "error" };
        record_jwks_fetch(status, start.elapsed());

        result
    }
}

/// Mock fetcher module for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock key-set fetcher that records every requested URL.
    pub struct MockKeySetFetcher {
        response: Result<KeySet, TokenError>,
        call_count: AtomicUsize,
        requested: Mutex<Vec<String>>,
    }

    impl MockKeySetFetcher {
        /// Create a mock that always serves `key_set`.
        pub fn serving(key_set: KeySet) -> Self {
            Self {
                response: Ok(key_set),
                call_count: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            }
        }

        /// Create a mock whose fetches always fail.
        pub fn failing(reason: &str) -> Self {
            Self {
                response: Err(TokenError::Fetch(reason.to_string())),
                call_count: AtomicUsize::new(0),
                requested: Mutex::new(Vec::new()),
            }
        }

        /// Number of fetches performed.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// URLs requested so far, in order.
        pub fn requested_urls(&self) -> Vec<String> {
            self.requested
                .lock()
                .map(|urls| urls.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl KeySetFetcher for MockKeySetFetcher {
        async fn fetch(&self, url: &Url) -> Result<KeySet, TokenError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut urls) = self.requested.lock() {
                urls.push(url.to_string());
            }
            self.response.clone()
        }
    }
}
