//! Test server harness for E2E testing
//!
//! Provides TestTokenServer for spawning real Token Authority instances in
//! tests. The server signs with the cached authority fixture key and
//! fetches key sets over real HTTP, so its own discovery URL and any local
//! mock server are reachable.

use crate::crypto_fixtures::authority_signing_key;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use ta_service::config::Config;
use ta_service::observability::metrics::init_metrics_recorder;
use ta_service::routes::{self, AppState};
use ta_service::services::{HttpKeySetFetcher, JkuTrustPolicy, TokenAuthority, UserStore};
use tokio::task::JoinHandle;

/// Flag served by test servers.
pub const TEST_FLAG: &str = "SHELLMATES{test_flag}";

/// Seeded users for test servers (`itachi` keeps its random password).
pub const TEST_SEED_USERS: &str = "guest:guest:genin;alice:wonderland:admin";

/// Knobs for a spawned test server.
#[derive(Debug, Clone)]
pub struct TestServerOptions {
    /// Hosts trusted in addition to `localhost` and `127.0.0.1`.
    pub extra_allowed_hosts: Vec<String>,
    pub allowed_suffixes: Vec<String>,
    pub fetch_timeout_ms: u64,
    pub seed_users: String,
    /// `false` leaves `BASE_URL` empty (unset).
    pub with_base_url: bool,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            extra_allowed_hosts: Vec::new(),
            allowed_suffixes: vec![".google.com".to_string()],
            fetch_timeout_ms: 3000,
            seed_users: TEST_SEED_USERS.to_string(),
            with_base_url: true,
        }
    }
}

/// Test harness for spawning the Token Authority in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_healthz() -> Result<()> {
///     let server = TestTokenServer::spawn().await?;
///     let response = reqwest::get(format!("{}/healthz", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestTokenServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestTokenServer {
    /// Spawn a server with default options.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(TestServerOptions::default()).await
    }

    /// Spawn a new test server instance
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Use `http://127.0.0.1:<port>` as its base URL
    /// - Trust `localhost`, `127.0.0.1` and the extra hosts
    /// - Hash seeded passwords at the minimum bcrypt cost
    pub async fn spawn_with(options: TestServerOptions) -> Result<Self, anyhow::Error> {
        // Bind first so the base URL can name the real port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let mut allowed_hosts = vec!["localhost".to_string(), "127.0.0.1".to_string()];
        allowed_hosts.extend(options.extra_allowed_hosts);

        let base_url = if options.with_base_url {
            format!("http://{}", addr)
        } else {
            String::new()
        };

        let vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), addr.to_string()),
            ("BASE_URL".to_string(), base_url),
            ("FLAG".to_string(), TEST_FLAG.to_string()),
            ("JKU_ALLOWED_HOSTS".to_string(), allowed_hosts.join(",")),
            (
                "JKU_ALLOWED_SUFFIXES".to_string(),
                options.allowed_suffixes.join(","),
            ),
            (
                "JKU_FETCH_TIMEOUT_MS".to_string(),
                options.fetch_timeout_ms.to_string(),
            ),
            ("BCRYPT_COST".to_string(), "4".to_string()),
            ("SEED_USERS".to_string(), options.seed_users),
        ]);
        let config = Config::from_vars(&vars)?;

        let fetcher = HttpKeySetFetcher::new(config.jku_fetch_timeout)?;
        let authority = TokenAuthority::with_signing_key(
            authority_signing_key(),
            config.base_url.clone(),
            JkuTrustPolicy::new(
                config.jku_allowed_hosts.clone(),
                config.jku_allowed_suffixes.clone(),
            ),
            Arc::new(fetcher),
        );
        let users = UserStore::from_config(&config)?;

        let state = Arc::new(AppState {
            config,
            authority: Arc::new(authority),
            users: Arc::new(users),
        });

        // Initialize metrics recorder for test server
        // Note: This fails if already installed in the test process; fall
        // back to a standalone recorder that is not installed globally.
        let metrics_handle = match init_metrics_recorder() {
            Ok(handle) => handle,
            Err(_) => PrometheusBuilder::new().build_recorder().handle(),
        };

        let app = routes::build_routes(state.clone(), metrics_handle);

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the discovery URL tokens are issued with
    pub fn jwks_url(&self) -> String {
        format!("{}/.well_know/jwks.json", self.url())
    }

    /// Issue a genuine token directly, bypassing `/login`.
    pub fn issue_token(&self, subject: &str, role: &str) -> Result<String, anyhow::Error> {
        Ok(self.state.authority.issue(subject, role)?)
    }
}

impl Drop for TestTokenServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
