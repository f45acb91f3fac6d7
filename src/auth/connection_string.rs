//! Registry connection string parsing.
//!
//! A connection string is a `;`-separated list of `Key=Value` pairs:
//!
//! ```text
//! HostName=my-hub.azure-devices.net;SharedAccessKeyName=registryReadWrite;SharedAccessKey=c2VjcmV0
//! ```
//!
//! Only the first `=` in a segment separates key from value, since base64 keys
//! end in `=` padding.

use crate::error::{ValidationError, ValidationResult};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use std::fmt;
use std::str::FromStr;

const HOST_NAME: &str = "HostName";
const SHARED_ACCESS_KEY_NAME: &str = "SharedAccessKeyName";
const SHARED_ACCESS_KEY: &str = "SharedAccessKey";
const DEVICE_SCOPED_KEYS: [&str; 2] = ["DeviceId", "ModuleId"];

/// Credentials for a registry, parsed from a connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    host_name: String,
    policy_name: String,
    shared_access_key: String,
}

impl ConnectionString {
    /// Parse a registry connection string.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when a segment is not a `Key=Value` pair,
    /// a required key is missing or empty, the string is scoped to a single
    /// device, or the shared key is not valid base64.
    pub fn parse(input: &str) -> ValidationResult<Self> {
        let mut host_name = None;
        let mut policy_name = None;
        let mut shared_access_key = None;

        for segment in input.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) =
                segment
                    .split_once('=')
                    .ok_or_else(|| ValidationError::MalformedConnectionString {
                        segment: segment.to_string(),
                    })?;
            let key = key.trim();
            let value = value.trim();

            if DEVICE_SCOPED_KEYS.contains(&key) {
                return Err(ValidationError::DeviceScopedConnectionString {
                    key: key.to_string(),
                });
            }

            match key {
                HOST_NAME => host_name = Some(value.to_string()),
                SHARED_ACCESS_KEY_NAME => policy_name = Some(value.to_string()),
                SHARED_ACCESS_KEY => shared_access_key = Some(value.to_string()),
                // Unknown keys (GatewayHostName, etc.) are tolerated
                _ => {}
            }
        }

        let host_name = required(host_name, HOST_NAME)?;
        let policy_name = required(policy_name, SHARED_ACCESS_KEY_NAME)?;
        let shared_access_key = required(shared_access_key, SHARED_ACCESS_KEY)?;

        BASE64
            .decode(&shared_access_key)
            .map_err(|_| ValidationError::InvalidSharedAccessKey)?;

        Ok(Self {
            host_name,
            policy_name,
            shared_access_key,
        })
    }

    /// Fully qualified host name of the registry.
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    /// The registry name, i.e. the host name up to the first `.`.
    pub fn hub_name(&self) -> &str {
        self.host_name
            .split('.')
            .next()
            .unwrap_or(&self.host_name)
    }

    /// Name of the shared access policy.
    pub fn policy_name(&self) -> &str {
        &self.policy_name
    }

    /// Base64-encoded shared access key.
    pub fn shared_access_key(&self) -> &str {
        &self.shared_access_key
    }

    /// Decoded shared access key bytes.
    pub fn key_bytes(&self) -> Vec<u8> {
        // Validated as base64 in `parse`
        BASE64.decode(&self.shared_access_key).unwrap_or_default()
    }
}

fn required(value: Option<String>, key: &str) -> ValidationResult<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ValidationError::MissingConnectionStringKey {
            key: key.to_string(),
        }),
    }
}

impl FromStr for ConnectionString {
    type Err = ValidationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={};{}={};{}=****",
            HOST_NAME, self.host_name, SHARED_ACCESS_KEY_NAME, self.policy_name, SHARED_ACCESS_KEY
        )
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("host_name", &self.host_name)
            .field("policy_name", &self.policy_name)
            .field("shared_access_key", &"[REDACTED]")
            .finish()
    }
}
