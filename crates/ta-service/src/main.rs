use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use ta_service::config::Config;
use ta_service::observability::{self, metrics::init_metrics_recorder};
use ta_service::routes::{self, AppState};
use ta_service::services::{HttpKeySetFetcher, TokenAuthority, UserStore};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    observability::init_tracing(json_logs);

    info!("Starting Token Authority");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        base_url = ?config.base_url,
        allowed_hosts = ?config.jku_allowed_hosts,
        fetch_timeout_ms = config.jku_fetch_timeout.as_millis() as u64,
        "Configuration loaded successfully"
    );

    if config.base_url.is_none() {
        warn!("BASE_URL is empty; logins will fail until it is set");
    }

    // Initialize metrics recorder before anything records
    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    // Generate the process signing key
    info!("Generating signing key...");
    let fetcher = HttpKeySetFetcher::new(config.jku_fetch_timeout).map_err(|e| {
        error!("Failed to build key-set fetcher: {}", e);
        e
    })?;
    let authority = TokenAuthority::initialize(&config, Arc::new(fetcher)).map_err(|e| {
        error!("Failed to initialize signing key: {}", e);
        e
    })?;

    if authority.policy().has_suffix_rules() {
        warn!(
            suffixes = ?authority.policy().suffixes(),
            "jku suffix allow-list is active: any host under these domains is trusted (unsafe outside training)"
        );
    }

    // Hash seeded credentials
    let users = UserStore::from_config(&config).map_err(|e| {
        error!("Failed to build user store: {}", e);
        e
    })?;

    // Parse bind address before moving config
    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    let state = Arc::new(AppState {
        config,
        authority: Arc::new(authority),
        users: Arc::new(users),
    });

    let app = routes::build_routes(state, metrics_handle);

    info!("Token Authority listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Token Authority shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and the drain period is over.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let drain_secs: u64 = std::env::var("TA_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    }
}
