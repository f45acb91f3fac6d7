//! Builder for configuring registry clients.
//!
//! The builder collects a connection string, an optional [`ClientConfig`] and
//! an optional transport. Without an explicit transport it opens a
//! [`ReqwestTransport`] to the connection string's host.

use super::RegistryClient;
use crate::auth::{ConnectionString, SasTokenProvider};
use crate::config::ClientConfig;
use crate::error::{BuildError, BuildResult};
use crate::transport::{HttpTransport, ReqwestTransport, TransportError};
use log::info;
use std::time::Duration;

/// Builder for [`RegistryClient`].
///
/// # Examples
///
/// ```rust
/// use hub_registry::{ClientConfig, RegistryClient};
/// use hub_registry::transport::InMemoryRegistry;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let connection_string =
///     "HostName=my-hub.azure-devices.net;SharedAccessKeyName=iothubowner;SharedAccessKey=c2VjcmV0";
///
/// // HTTPS client with default settings
/// let client = RegistryClient::builder()
///     .connection_string(connection_string)
///     .build()?;
/// assert_eq!(client.host_name(), "my-hub.azure-devices.net");
///
/// // Custom configuration and an in-process registry
/// let client = RegistryClient::builder()
///     .connection_string(connection_string)
///     .config(ClientConfig::default().with_request_timeout(Duration::from_secs(5)))
///     .transport(InMemoryRegistry::new())
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RegistryClientBuilder<T = ReqwestTransport> {
    connection_string: Option<String>,
    config: ClientConfig,
    transport: TransportSource<T>,
}

/// Where the built client's transport comes from.
enum TransportSource<T> {
    Given(T),
    Connect(fn(&str, Duration) -> Result<T, TransportError>),
}

impl Default for RegistryClientBuilder<ReqwestTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryClientBuilder<ReqwestTransport> {
    /// Create a builder with the default configuration and HTTPS transport.
    pub fn new() -> Self {
        Self {
            connection_string: None,
            config: ClientConfig::default(),
            transport: TransportSource::Connect(ReqwestTransport::new),
        }
    }

    /// Create a builder preloaded with a connection string.
    pub fn from_connection_string(connection_string: impl Into<String>) -> Self {
        Self::new().connection_string(connection_string)
    }
}

impl<T> RegistryClientBuilder<T> {
    /// Set the registry connection string.
    pub fn connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = Some(connection_string.into());
        self
    }

    /// Replace the client configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a specific transport instead of connecting one.
    pub fn transport<U: HttpTransport>(self, transport: U) -> RegistryClientBuilder<U> {
        RegistryClientBuilder {
            connection_string: self.connection_string,
            config: self.config,
            transport: TransportSource::Given(transport),
        }
    }
}

impl<T: HttpTransport> RegistryClientBuilder<T> {
    /// Validate the settings and create the client.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if the connection string is missing or
    /// malformed, the configuration is invalid, or the transport cannot be
    /// created.
    pub fn build(self) -> BuildResult<RegistryClient<T>> {
        let connection_string = self
            .connection_string
            .ok_or(BuildError::MissingCredential)?;
        let credential = ConnectionString::parse(&connection_string)?;

        self.config
            .validate()
            .map_err(|e| BuildError::InvalidConfig {
                message: e.to_string(),
            })?;

        let transport = match self.transport {
            TransportSource::Given(transport) => transport,
            TransportSource::Connect(connect) => {
                connect(credential.host_name(), self.config.request_timeout)?
            }
        };

        info!(
            "registry client for {} (policy {}, api-version {})",
            credential.host_name(),
            credential.policy_name(),
            self.config.api_version
        );

        let tokens = SasTokenProvider::new(credential, self.config.token_ttl)?;
        Ok(RegistryClient::from_parts(self.config, tokens, transport))
    }
}
