//! Observability for the Token Authority: Prometheus metrics and log setup.
//!
//! # Privacy
//!
//! Instrumentation uses `#[instrument(skip_all)]`. Subjects, passwords,
//! tokens and the flag never appear in logs or metric labels. Verification
//! failures are logged by category only.

pub mod metrics;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "ta_service=debug,ta=debug,tower_http=debug";

/// Install the global tracing subscriber.
///
/// `json` selects structured JSON output; otherwise the human-readable fmt
/// layer is used.
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
