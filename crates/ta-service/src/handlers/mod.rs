//! HTTP request handlers for the Token Authority.

pub mod auth_handler;
pub mod health;
pub mod jwks_handler;
pub mod metrics;
pub mod pages;

pub use auth_handler::{handle_login, handle_login_page, handle_logout};
pub use health::health_check;
pub use jwks_handler::handle_get_jwks;
pub use metrics::metrics_handler;
pub use pages::{handle_index, handle_power, handle_profile};
