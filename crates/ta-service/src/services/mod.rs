//! Service layer for the Token Authority.
//!
//! # Components
//!
//! - `token_authority` - Key material, token issuance and `jku` verification
//! - `trust_policy` - `jku` host allow-list
//! - `key_set_fetcher` - HTTP retrieval of remote key sets
//! - `user_service` - In-memory credential store

pub mod key_set_fetcher;
pub mod token_authority;
pub mod trust_policy;
pub mod user_service;

pub use key_set_fetcher::{HttpKeySetFetcher, KeySetFetcher};
// Mock fetcher for testing (exposed for integration tests)
#[allow(unused_imports)]
pub use key_set_fetcher::mock::MockKeySetFetcher;
pub use token_authority::TokenAuthority;
pub use trust_policy::JkuTrustPolicy;
pub use user_service::UserStore;
