//! Client library for a device identity registry service.
//!
//! Manages device identities, module identities, twins, configurations and
//! bulk import/export jobs over the registry's REST API, with explicit
//! optimistic concurrency on every mutating call.
//!
//! # Core Components
//!
//! - [`RegistryClient`] - Entry point; hands out per-resource clients
//! - [`Precondition`] - Decides the `If-Match` header from a [`ConcurrencyPolicy`] and an [`ETag`]
//! - [`transport::HttpTransport`] - Pluggable transport, with HTTPS and in-memory implementations
//! - [`blocking`] - Synchronous wrappers for callers without an async runtime
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hub_registry::{ConcurrencyPolicy, Device, RegistryClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RegistryClient::from_connection_string(
//!     "HostName=my-hub.azure-devices.net;SharedAccessKeyName=iothubowner;SharedAccessKey=c2VjcmV0",
//! )?;
//!
//! let device = client.devices().get("sensor-1").await?;
//! let device = device.with_status(hub_registry::DeviceStatus::Disabled, None);
//!
//! // Fails with RegistryError::PreconditionFailed if someone else changed it first.
//! client.devices().update(&device, ConcurrencyPolicy::IfMatch).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod resource;
pub mod transport;

// Re-export commonly used types for convenience
pub use auth::{ConnectionString, SasTokenProvider};
pub use client::{
    ConfigurationClient, DeviceClient, JobClient, ModuleClient, RegistryClient,
    RegistryClientBuilder, TwinClient,
};
pub use config::ClientConfig;
pub use error::{BuildError, RegistryError, RegistryResult, ValidationError};

// Resource model
pub use resource::{
    AuthenticationMechanism, AuthenticationType, ConcurrencyPolicy, Configuration,
    ConfigurationContent, Device, DeviceStatus, ETag, JobProperties, JobStatus, JobType, Module,
    Precondition, QueryPage, RegistryStatistics, StorageAuthenticationType, Twin, Versioned,
};
