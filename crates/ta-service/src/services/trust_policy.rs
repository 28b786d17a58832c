//! `jku` host allow-list.
//!
//! A `jku` URL is trusted when its scheme is `http` or `https` and its
//! lowercased host either equals an allowed host or ends with an allowed
//! suffix (e.g. `.google.com`).
//!
//! # Security
//!
//! Suffix matching is a plain string `ends_with`. Any host under an allowed
//! suffix is trusted, including hosts whose content an attacker controls
//! (hosted pages, open redirects, user uploads). This is an unsafe default
//! kept for training; production verifiers must pin the exact key-set URL.

use crate::errors::TokenError;
use url::Url;

/// Schemes a `jku` URL may use.
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Static allow-list consulted before any key-set fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JkuTrustPolicy {
    hosts: Vec<String>,
    suffixes: Vec<String>,
}

impl JkuTrustPolicy {
    /// Build a policy from exact hosts and domain suffixes.
    ///
    /// Entries are compared lowercased. Suffixes are expected to carry their
    /// leading dot; config loading enforces this.
    pub fn new(hosts: Vec<String>, suffixes: Vec<String>) -> Self {
        Self {
            hosts: hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect(),
            suffixes: suffixes
                .into_iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether any suffix rules are active.
    pub fn has_suffix_rules(&self) -> bool {
        !self.suffixes.is_empty()
    }

    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Parse a raw `jku` value and check scheme and host.
    ///
    /// Returns the parsed URL on success so the caller fetches exactly what
    /// was checked.
    pub fn check(&self, jku: &str) -> Result<Url, TokenError> {
        let url = Url::parse(jku).map_err(|e| {
            tracing::debug!(target: "ta.trust", error = %e, "jku is not a valid URL");
            TokenError::MalformedJkuUrl
        })?;

        if !ALLOWED_SCHEMES.contains(&url.scheme()) {
            return Err(TokenError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = url
            .host_str()
            .ok_or(TokenError::MalformedJkuUrl)?
            .to_ascii_lowercase();

        if self.is_trusted_host(&host) {
            Ok(url)
        } else {
            Err(TokenError::UntrustedHost(host))
        }
    }

    /// Exact host match, then suffix match.
    pub fn is_trusted_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();

        if self.hosts.iter().any(|h| *h == host) {
            return true;
        }

        self.suffixes.iter().any(|s| host.ends_with(s.as_str()))
    }
}
