//! Registry clients.
//!
//! [`RegistryClient`] owns the credential, configuration and transport, and
//! hands out one lightweight client per resource family:
//!
//! - [`DeviceClient`] - device identities and registry statistics
//! - [`ModuleClient`] - module identities
//! - [`TwinClient`] - device and module twins, twin queries
//! - [`JobClient`] - bulk import/export jobs
//! - [`ConfigurationClient`] - automatic device management configurations
//!
//! Every operation follows the same pipeline: validate arguments locally,
//! compute the `If-Match` precondition for mutating calls, sign and send the
//! request, then map the response status to a [`RegistryError`]. Nothing is
//! retried; a `412` surfaces as [`RegistryError::PreconditionFailed`].
//!
//! # Example Usage
//!
//! ```rust
//! use hub_registry::{ConcurrencyPolicy, Device, RegistryClient};
//! use hub_registry::transport::InMemoryRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RegistryClient::builder()
//!     .connection_string("HostName=my-hub.azure-devices.net;SharedAccessKeyName=registryReadWrite;SharedAccessKey=c2VjcmV0")
//!     .transport(InMemoryRegistry::new())
//!     .build()?;
//!
//! let device = client.devices().create(&Device::new("sensor-1")?).await?;
//! let device = client
//!     .devices()
//!     .update(&device.with_edge_capability(true), ConcurrencyPolicy::IfMatch)
//!     .await?;
//! assert!(device.is_edge());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod configurations;
pub mod devices;
pub mod jobs;
pub mod modules;
pub mod twins;

pub use builder::RegistryClientBuilder;
pub use configurations::ConfigurationClient;
pub use devices::DeviceClient;
pub use jobs::JobClient;
pub use modules::ModuleClient;
pub use twins::TwinClient;

use crate::auth::SasTokenProvider;
use crate::config::ClientConfig;
use crate::error::{BuildResult, RegistryError, RegistryResult};
use crate::resource::precondition::{ConcurrencyPolicy, IF_MATCH_HEADER, Precondition, Versioned};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Entry point to the registry service.
///
/// Cloning is cheap; clones share the same credential and transport.
pub struct RegistryClient<T = ReqwestTransport> {
    inner: Arc<ClientInner<T>>,
}

struct ClientInner<T> {
    config: ClientConfig,
    tokens: SasTokenProvider,
    transport: T,
}

impl<T> Clone for RegistryClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for RegistryClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("host_name", &self.host_name())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl RegistryClient<ReqwestTransport> {
    /// Start building a client.
    pub fn builder() -> RegistryClientBuilder<ReqwestTransport> {
        RegistryClientBuilder::new()
    }

    /// Create an HTTPS client with default configuration.
    pub fn from_connection_string(connection_string: &str) -> BuildResult<Self> {
        RegistryClientBuilder::new()
            .connection_string(connection_string)
            .build()
    }
}

impl<T> RegistryClient<T> {
    pub(crate) fn from_parts(config: ClientConfig, tokens: SasTokenProvider, transport: T) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                tokens,
                transport,
            }),
        }
    }

    /// The registry host requests are sent to.
    pub fn host_name(&self) -> &str {
        self.inner.tokens.credential().host_name()
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }
}

impl<T: HttpTransport> RegistryClient<T> {
    /// Device identity operations.
    pub fn devices(&self) -> DeviceClient<T> {
        DeviceClient::new(self.clone())
    }

    /// Module identity operations.
    pub fn modules(&self) -> ModuleClient<T> {
        ModuleClient::new(self.clone())
    }

    /// Twin operations.
    pub fn twins(&self) -> TwinClient<T> {
        TwinClient::new(self.clone())
    }

    /// Import/export job operations.
    pub fn jobs(&self) -> JobClient<T> {
        JobClient::new(self.clone())
    }

    /// Configuration operations.
    pub fn configurations(&self) -> ConfigurationClient<T> {
        ConfigurationClient::new(self.clone())
    }

    /// The precondition for writing `resource` under `policy`.
    ///
    /// With [`ClientConfig::strict_preconditions`] set, `IfMatch` on a snapshot
    /// without an ETag fails locally instead of falling back to `*`.
    pub(crate) fn precondition<R>(
        &self,
        policy: ConcurrencyPolicy,
        resource: &R,
    ) -> RegistryResult<Precondition>
    where
        R: Versioned + ?Sized,
    {
        if self.inner.config.strict_preconditions {
            Ok(Precondition::strict(policy, resource)?)
        } else {
            Ok(Precondition::for_resource(policy, resource))
        }
    }

    /// A signed request carrying the API version and user agent.
    pub(crate) fn request<I, S>(&self, method: Method, segments: I) -> HttpRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HttpRequest::new(method, segments)
            .with_query("api-version", self.inner.config.api_version.as_str())
            .with_header("Authorization", self.inner.tokens.token())
            .with_header("User-Agent", self.inner.config.user_agent.as_str())
    }

    /// Send a request and return the response if its status is 2xx.
    pub(crate) async fn execute(&self, request: HttpRequest) -> RegistryResult<HttpResponse> {
        let request = match &request.body {
            Some(_) => request.with_header("Content-Type", "application/json; charset=utf-8"),
            None => request,
        };
        let method = request.method;
        let path = request.path();
        let precondition = request.header(IF_MATCH_HEADER).map(str::to_string);

        debug!(
            "{} {} (If-Match: {})",
            method,
            path,
            precondition.as_deref().unwrap_or("none")
        );

        let response = self.inner.transport.send(request).await?;
        if response.is_success() {
            debug!("{} {} -> {}", method, path, response.status);
            return Ok(response);
        }

        let message = error_message(&response);
        if response.status == 412 {
            warn!(
                "{} {} rejected: precondition {} no longer matches ({})",
                method,
                path,
                precondition.as_deref().unwrap_or("none"),
                message
            );
        } else {
            debug!("{} {} -> {}: {}", method, path, response.status, message);
        }
        Err(RegistryError::from_status(response.status, message))
    }

    /// Send a request and decode the JSON response body.
    pub(crate) async fn execute_json<R>(&self, request: HttpRequest) -> RegistryResult<R>
    where
        R: DeserializeOwned,
    {
        let response = self.execute(request).await?;
        Ok(serde_json::from_str(&response.body)?)
    }
}

/// Attach the evaluated precondition to a mutating request.
pub(crate) fn conditional(request: HttpRequest, precondition: &Precondition) -> HttpRequest {
    request.with_header(IF_MATCH_HEADER, precondition.header_value())
}

/// The service's error message from a failed response.
///
/// The registry reports failures as `{"Message": "..."}`; anything else is
/// passed through verbatim.
fn error_message(response: &HttpResponse) -> String {
    if response.body.trim().is_empty() {
        return format!("service returned status {}", response.status);
    }
    serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| {
            body.get("Message")
                .or_else(|| body.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| response.body.clone())
}
