//! Secret types for values that must never reach logs.
//!
//! Re-exports the [`secrecy`] wrappers and adds a CSPRNG helper for
//! generating throwaway credentials at startup.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginForm {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let form = LoginForm {
//!     username: "guest".to_string(),
//!     password: SecretString::from("guest"),
//! };
//!
//! // Debug output is redacted
//! assert!(!format!("{form:?}").contains("password: \"guest\""));
//! assert_eq!(form.password.expose_secret(), "guest");
//! ```
//!
//! Use `SecretString` for the challenge flag, seeded user passwords and
//! bearer tokens echoed back to clients.

pub use secrecy::{ExposeSecret, SecretString};

use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

/// Errors raised while generating secret material.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// The operating system CSPRNG refused to produce bytes.
    #[error("Random generation failed")]
    RandomUnavailable,
}

/// Generate `byte_len` random bytes from the OS CSPRNG, hex encoded.
///
/// The returned string is `2 * byte_len` characters long.
///
/// # Errors
///
/// Returns `SecretError::RandomUnavailable` if the system RNG fails.
pub fn random_hex_secret(byte_len: usize) -> Result<SecretString, SecretError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; byte_len];
    rng.fill(&mut bytes)
        .map_err(|_| SecretError::RandomUnavailable)?;

    Ok(SecretString::from(hex::encode(bytes)))
}
