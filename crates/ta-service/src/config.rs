//! Token Authority configuration.
//!
//! Configuration is loaded from environment variables. The flag and seeded
//! passwords are redacted in Debug output.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Default public base URL used to build the `jku` discovery URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Default challenge flag served from the privileged page.
pub const DEFAULT_FLAG: &str = "SHELLMATES{fake_flag}";

/// Default exact hosts a `jku` may point at.
pub const DEFAULT_JKU_ALLOWED_HOSTS: &[&str] = &["localhost", "google.com"];

/// Default domain suffixes a `jku` host may end with.
///
/// Every suffix carries its leading dot so `evil-google.com` does not
/// match `.google.com`.
pub const DEFAULT_JKU_ALLOWED_SUFFIXES: &[&str] = &[".google.com"];

/// Default key-set fetch timeout in milliseconds.
pub const DEFAULT_JKU_FETCH_TIMEOUT_MS: u64 = 3000;

/// Upper bound for the key-set fetch timeout.
pub const MAX_JKU_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Default bcrypt cost for seeded user passwords.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Minimum bcrypt cost accepted (the bcrypt crate's own floor).
pub const MIN_BCRYPT_COST: u32 = 4;

/// Maximum bcrypt cost accepted.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Default role required by the privileged page.
pub const DEFAULT_PRIVILEGED_ROLE: &str = "uchiha";

/// Default seeded users, `name:password:role` separated by `;`.
pub const DEFAULT_SEED_USERS: &str = "guest:guest:genin";

/// A user account declared through configuration.
#[derive(Debug, Clone)]
pub struct SeedUser {
    pub username: String,
    pub password: SecretString,
    pub role: String,
}

/// Token Authority configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:3000").
    pub bind_address: String,

    /// Public base URL of this service, without trailing slash.
    ///
    /// `None` when `BASE_URL` is explicitly set to an empty value; token
    /// issuance then fails with a configuration error.
    pub base_url: Option<String>,

    /// Flag revealed to holders of the privileged role.
    pub flag: SecretString,

    /// Exact `jku` hostnames accepted (lowercase).
    pub jku_allowed_hosts: Vec<String>,

    /// `jku` hostname suffixes accepted (lowercase, leading dot).
    pub jku_allowed_suffixes: Vec<String>,

    /// Timeout applied to every key-set fetch.
    pub jku_fetch_timeout: Duration,

    /// Bcrypt cost used when hashing seeded passwords.
    pub bcrypt_cost: u32,

    /// Users available for login.
    pub seed_users: Vec<SeedUser>,

    /// Role required by `/power`.
    pub privileged_role: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("base_url", &self.base_url)
            .field("flag", &"[REDACTED]")
            .field("jku_allowed_hosts", &self.jku_allowed_hosts)
            .field("jku_allowed_suffixes", &self.jku_allowed_suffixes)
            .field("jku_fetch_timeout", &self.jku_fetch_timeout)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("seed_users", &self.seed_users)
            .field("privileged_role", &self.privileged_role)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid jku suffix '{0}': suffixes must start with '.'")]
    InvalidJkuSuffix(String),

    #[error("Invalid jku fetch timeout: {0}")]
    InvalidFetchTimeout(String),

    #[error("Invalid bcrypt cost: {0}")]
    InvalidBcryptCost(String),

    #[error("Invalid seed user entry: {0}")]
    InvalidSeedUser(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        // BIND_ADDRESS wins; a bare PORT binds all interfaces
        let bind_address = match (vars.get("BIND_ADDRESS"), vars.get("PORT")) {
            (Some(address), _) => address.clone(),
            (None, Some(port)) => format!("0.0.0.0:{}", port.trim()),
            (None, None) => DEFAULT_BIND_ADDRESS.to_string(),
        };

        let base_url = match vars.get("BASE_URL") {
            None => Some(DEFAULT_BASE_URL.to_string()),
            Some(value) => {
                let trimmed = value.trim().trim_end_matches('/');
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
        };

        let flag = SecretString::from(
            vars.get("FLAG")
                .cloned()
                .unwrap_or_else(|| DEFAULT_FLAG.to_string()),
        );

        let jku_allowed_hosts = match vars.get("JKU_ALLOWED_HOSTS") {
            Some(list) => parse_list(list),
            None => DEFAULT_JKU_ALLOWED_HOSTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let jku_allowed_suffixes = match vars.get("JKU_ALLOWED_SUFFIXES") {
            Some(list) => parse_list(list),
            None => DEFAULT_JKU_ALLOWED_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        if let Some(bad) = jku_allowed_suffixes.iter().find(|s| !s.starts_with('.')) {
            return Err(ConfigError::InvalidJkuSuffix(bad.clone()));
        }

        let jku_fetch_timeout_ms = if let Some(value_str) = vars.get("JKU_FETCH_TIMEOUT_MS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidFetchTimeout(format!(
                    "JKU_FETCH_TIMEOUT_MS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 || value > MAX_JKU_FETCH_TIMEOUT_MS {
                return Err(ConfigError::InvalidFetchTimeout(format!(
                    "JKU_FETCH_TIMEOUT_MS must be between 1 and {}, got {}",
                    MAX_JKU_FETCH_TIMEOUT_MS, value
                )));
            }

            value
        } else {
            DEFAULT_JKU_FETCH_TIMEOUT_MS
        };

        let bcrypt_cost = if let Some(value_str) = vars.get("BCRYPT_COST") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidBcryptCost(format!(
                    "BCRYPT_COST must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&value) {
                return Err(ConfigError::InvalidBcryptCost(format!(
                    "BCRYPT_COST must be between {} and {}, got {}",
                    MIN_BCRYPT_COST, MAX_BCRYPT_COST, value
                )));
            }

            value
        } else {
            DEFAULT_BCRYPT_COST
        };

        let seed_users = parse_seed_users(
            vars.get("SEED_USERS")
                .map(String::as_str)
                .unwrap_or(DEFAULT_SEED_USERS),
        )?;

        let privileged_role = vars
            .get("PRIVILEGED_ROLE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_PRIVILEGED_ROLE.to_string());

        Ok(Config {
            bind_address,
            base_url,
            flag,
            jku_allowed_hosts,
            jku_allowed_suffixes,
            jku_fetch_timeout: Duration::from_millis(jku_fetch_timeout_ms),
            bcrypt_cost,
            seed_users,
            privileged_role,
        })
    }
}

/// Split a comma separated list, trimming and lowercasing entries.
fn parse_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse `name:password:role` entries separated by `;`.
///
/// The password may itself contain `:`; the role is everything after the
/// last colon.
fn parse_seed_users(spec: &str) -> Result<Vec<SeedUser>, ConfigError> {
    let mut users = Vec::new();

    for entry in spec.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (username, rest) = entry
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidSeedUser(redact_entry(entry)))?;
        let (password, role) = rest
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::InvalidSeedUser(redact_entry(entry)))?;

        if username.is_empty() || password.is_empty() || role.is_empty() {
            return Err(ConfigError::InvalidSeedUser(redact_entry(entry)));
        }

        users.push(SeedUser {
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
            role: role.to_string(),
        });
    }

    Ok(users)
}

/// Keep only the username part of a seed entry for error messages.
fn redact_entry(entry: &str) -> String {
    let username = entry.split(':').next().unwrap_or_default();
    format!("{}:[REDACTED]", username)
}
