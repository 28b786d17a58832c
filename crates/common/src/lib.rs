//! Common utilities shared across the Binding Force crates.

#![warn(clippy::pedantic)]

/// Module for JWT header inspection ahead of verification
pub mod jwt;

/// Module for secret types that prevent accidental logging
pub mod secret;
