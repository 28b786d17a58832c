//! In-memory credential store.
//!
//! Built once at startup from configured seed users. Passwords are kept
//! only as bcrypt hashes. The privileged account always exists; unless it
//! is seeded explicitly its password is random and never leaves the
//! process, so the only way to its role is through the token weakness.

use crate::config::{Config, SeedUser};
use crate::errors::UserError;
use common::secret::{random_hex_secret, ExposeSecret, SecretString};
use std::collections::HashMap;
use std::fmt;
use tracing::instrument;

/// Username of the account holding the privileged role.
pub const PRIVILEGED_USERNAME: &str = "itachi";

/// Random bytes in a generated privileged password.
const GENERATED_PASSWORD_BYTES: usize = 32;

struct StoredUser {
    password_hash: String,
    role: String,
}

/// Username to (bcrypt hash, role) map. Immutable after construction.
pub struct UserStore {
    users: HashMap<String, StoredUser>,
    // Verified against for unknown usernames so every login pays one bcrypt
    dummy_hash: String,
}

impl fmt::Debug for UserStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut usernames: Vec<&String> = self.users.keys().collect();
        usernames.sort();
        f.debug_struct("UserStore")
            .field("users", &usernames)
            .finish_non_exhaustive()
    }
}

impl UserStore {
    /// Build the store from configuration.
    pub fn from_config(config: &Config) -> Result<Self, UserError> {
        Self::new(&config.seed_users, &config.privileged_role, config.bcrypt_cost)
    }

    /// Hash every seed user and add the privileged account if missing.
    #[instrument(skip_all, name = "ta.users.build")]
    pub fn new(
        seed_users: &[SeedUser],
        privileged_role: &str,
        bcrypt_cost: u32,
    ) -> Result<Self, UserError> {
        let mut users = HashMap::with_capacity(seed_users.len() + 1);

        for seed in seed_users {
            let password_hash = hash_password(&seed.password, bcrypt_cost)?;
            users.insert(
                seed.username.clone(),
                StoredUser {
                    password_hash,
                    role: seed.role.clone(),
                },
            );
        }

        if !users.contains_key(PRIVILEGED_USERNAME) {
            let password =
                random_hex_secret(GENERATED_PASSWORD_BYTES).map_err(|_| UserError::RandomUnavailable)?;
            users.insert(
                PRIVILEGED_USERNAME.to_string(),
                StoredUser {
                    password_hash: hash_password(&password, bcrypt_cost)?,
                    role: privileged_role.to_string(),
                },
            );
            tracing::info!(
                target: "ta.users",
                username = PRIVILEGED_USERNAME,
                "Privileged account created with a random password"
            );
        }

        let dummy_password =
            random_hex_secret(GENERATED_PASSWORD_BYTES).map_err(|_| UserError::RandomUnavailable)?;
        let dummy_hash = hash_password(&dummy_password, bcrypt_cost)?;

        tracing::info!(target: "ta.users", count = users.len(), "User store ready");

        Ok(Self { users, dummy_hash })
    }

    /// Check a username/password pair and return the user's role.
    ///
    /// Unknown usernames and wrong passwords are indistinguishable, both in
    /// the result and in the work performed. Blocking; call from
    /// `spawn_blocking` in async contexts.
    #[instrument(skip_all, name = "ta.users.authenticate")]
    pub fn authenticate(&self, username: &str, password: &SecretString) -> Result<String, UserError> {
        let user = self.users.get(username);
        let hash = user.map_or(self.dummy_hash.as_str(), |u| u.password_hash.as_str());

        let is_valid = bcrypt::verify(password.expose_secret(), hash)
            .map_err(|e| UserError::Hashing(e.to_string()))?;

        match user {
            Some(user) if is_valid => Ok(user.role.clone()),
            _ => Err(UserError::InvalidCredentials),
        }
    }
}

fn hash_password(password: &SecretString, cost: u32) -> Result<String, UserError> {
    bcrypt::hash(password.expose_secret(), cost)
        .map_err(|e| UserError::Hashing(format!("bcrypt hash failed: {}", e)))
}
