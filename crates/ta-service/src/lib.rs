//! Token Authority (TA) Service Library
//!
//! A deliberately vulnerable `jku` token service for security training.
//! Tokens carry a `jku` header naming the key set to verify them with, and
//! the verifier fetches that set from any allow-listed host.
//!
//! # Modules
//!
//! - `config` - Service configuration
//! - `crypto` - RSA key material, RS256 signing and JWK verification
//! - `errors` - Error types
//! - `handlers` - HTTP request handlers
//! - `middleware` - Token attachment and gates
//! - `models` - Claims, JWK and response models
//! - `observability` - Metrics and log setup
//! - `routes` - Router and application state
//! - `services` - Token Authority, trust policy, key-set fetcher, user store

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
