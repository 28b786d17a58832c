//! Middleware for the Token Authority.
//!
//! # Components
//!
//! - `auth` - Token attachment, authentication and role gates
//! - `http_metrics` - HTTP request metrics

pub mod auth;
pub mod http_metrics;

pub use auth::{attach_user, require_auth, require_privileged_role, CurrentUser};
pub use http_metrics::http_metrics_middleware;
