//! Registry credentials.
//!
//! A client is built from a registry connection string. The string is parsed
//! once into a [`ConnectionString`], and every request is authorized with a
//! shared access signature issued by [`SasTokenProvider`].
//!
//! ```rust
//! use hub_registry::auth::{ConnectionString, SasTokenProvider};
//! use std::time::Duration;
//!
//! let credential = ConnectionString::parse(
//!     "HostName=my-hub.azure-devices.net;SharedAccessKeyName=registryReadWrite;SharedAccessKey=c2VjcmV0",
//! )?;
//! assert_eq!(credential.hub_name(), "my-hub");
//!
//! let tokens = SasTokenProvider::new(credential, Duration::from_secs(3600))?;
//! assert!(tokens.token().starts_with("SharedAccessSignature "));
//! # Ok::<(), hub_registry::error::ValidationError>(())
//! ```

pub mod connection_string;
pub mod sas;

pub use connection_string::ConnectionString;
pub use sas::SasTokenProvider;
