//! Client configuration.
//!
//! [`ClientConfig`] carries the settings shared by every request a
//! [`RegistryClient`](crate::client::RegistryClient) issues. Defaults match the
//! service's current API; individual values can be overridden with the
//! `with_*` methods or from the environment.

use crate::error::{RegistryError, RegistryResult};
use std::time::Duration;

/// Service API version sent as the `api-version` query parameter.
pub const DEFAULT_API_VERSION: &str = "2021-04-12";

/// Environment variable overriding [`ClientConfig::api_version`].
pub const API_VERSION_ENV: &str = "HUB_REGISTRY_API_VERSION";
/// Environment variable overriding [`ClientConfig::request_timeout`], in milliseconds.
pub const REQUEST_TIMEOUT_ENV: &str = "HUB_REGISTRY_REQUEST_TIMEOUT_MS";
/// Environment variable overriding [`ClientConfig::token_ttl`], in seconds.
pub const TOKEN_TTL_ENV: &str = "HUB_REGISTRY_TOKEN_TTL_SECS";

/// Longest accepted shared access signature lifetime (365 days).
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Settings applied to every request of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Value of the `api-version` query parameter.
    pub api_version: String,

    /// Per-request timeout handed to the HTTP transport.
    pub request_timeout: Duration,

    /// Lifetime of each generated shared access signature.
    pub token_ttl: Duration,

    /// Value of the `User-Agent` header.
    pub user_agent: String,

    /// Refuse `IfMatch` writes on snapshots without an ETag instead of
    /// sending `If-Match: *`.
    pub strict_preconditions: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout: Duration::from_secs(30),
            token_ttl: Duration::from_secs(3600),
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            strict_preconditions: false,
        }
    }
}

impl ClientConfig {
    /// Set the API version.
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the shared access signature lifetime.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set the `User-Agent` header value.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Fail `IfMatch` writes locally when the snapshot has no ETag.
    pub fn with_strict_preconditions(mut self, strict: bool) -> Self {
        self.strict_preconditions = strict;
        self
    }

    /// Defaults overridden by any `HUB_REGISTRY_*` variables that are set.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if a variable is set to a value that
    /// cannot be parsed, or if the result fails [`validate`](Self::validate).
    pub fn from_env() -> RegistryResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> RegistryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(api_version) = lookup(API_VERSION_ENV) {
            config.api_version = api_version;
        }
        if let Some(millis) = lookup(REQUEST_TIMEOUT_ENV) {
            config.request_timeout = Duration::from_millis(parse_number(REQUEST_TIMEOUT_ENV, &millis)?);
        }
        if let Some(secs) = lookup(TOKEN_TTL_ENV) {
            config.token_ttl = Duration::from_secs(parse_number(TOKEN_TTL_ENV, &secs)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be used to issue requests.
    pub fn validate(&self) -> RegistryResult<()> {
        if self.api_version.trim().is_empty() {
            return Err(RegistryError::config("API version cannot be empty"));
        }
        if self.request_timeout.is_zero() {
            return Err(RegistryError::config("Request timeout must be positive"));
        }
        if self.token_ttl.is_zero() {
            return Err(RegistryError::config("Token lifetime must be positive"));
        }
        if self.token_ttl > MAX_TOKEN_TTL {
            return Err(RegistryError::config(format!(
                "Token lifetime must not exceed {} seconds",
                MAX_TOKEN_TTL.as_secs()
            )));
        }
        Ok(())
    }
}

fn parse_number(name: &str, value: &str) -> RegistryResult<u64> {
    value.trim().parse().map_err(|_| {
        RegistryError::config(format!("{} must be a whole number, got '{}'", name, value))
    })
}
