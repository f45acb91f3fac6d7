//! Registry resource model.
//!
//! Plain data records mirroring the service's JSON shapes, plus the ETag and
//! precondition types every mutating call goes through.
//!
//! # Key Types
//!
//! - [`Device`], [`Module`] - identities
//! - [`Twin`] - desired/reported state document of an identity
//! - [`Configuration`] - automatic device management configuration
//! - [`JobProperties`] - bulk import/export job descriptor
//! - [`ETag`], [`ConcurrencyPolicy`], [`Precondition`] - optimistic concurrency

pub mod authentication;
pub mod configuration;
pub mod device;
pub mod etag;
pub mod identifier;
pub mod job;
pub mod module;
pub mod precondition;
pub mod query;
pub mod statistics;
pub mod twin;

pub use authentication::{AuthenticationMechanism, AuthenticationType, SymmetricKey, X509Thumbprint};
pub use configuration::{Configuration, ConfigurationContent, ConfigurationMetrics};
pub use device::{ConnectionState, Device, DeviceCapabilities, DeviceStatus};
pub use etag::{ETag, ETagError};
pub use job::{JobProperties, JobStatus, JobType, StorageAuthenticationType};
pub use module::Module;
pub use precondition::{ConcurrencyPolicy, Precondition, Versioned};
pub use query::QueryPage;
pub use statistics::RegistryStatistics;
pub use twin::{Twin, TwinCollection, TwinProperties};
