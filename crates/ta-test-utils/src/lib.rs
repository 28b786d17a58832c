//! # TA Test Utilities
//!
//! Shared test utilities for the Token Authority (TA) service.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (seeded RSA keys, cached per process)
//! - Forged token builder (attacker-signed tokens with arbitrary headers)
//! - Server test harness (TestTokenServer for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ta_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestTokenServer::spawn().await?;
//!
//!     let token = ForgedTokenBuilder::new()
//!         .subject("mallory")
//!         .role("uchiha")
//!         .jku("https://attacker.example/jwks.json")
//!         .build();
//!
//!     // Untrusted jku: the server ignores the token
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
