//! Module identities.
//!
//! A module is a named identity nested under exactly one device. It carries its
//! own credentials and its own ETag, independent of the parent device's.

use super::authentication::AuthenticationMechanism;
use super::device::ConnectionState;
use super::etag::{self, ETag};
use super::identifier;
use super::precondition::Versioned;
use crate::error::ValidationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A module identity as stored in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    device_id: String,
    module_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    generation_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "etag::deserialize_optional",
        skip_serializing_if = "Option::is_none"
    )]
    etag: Option<ETag>,

    /// Who manages this module, e.g. `"iotEdge"` for runtime-deployed modules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,

    #[serde(default)]
    pub connection_state: ConnectionState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_state_updated_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub cloud_to_device_message_count: i64,

    #[serde(default)]
    pub authentication: AuthenticationMechanism,
}

impl Module {
    /// Create a new, unversioned module under `device_id`.
    pub fn new(device_id: impl Into<String>, module_id: impl Into<String>) -> ValidationResult<Self> {
        let device_id = device_id.into();
        let module_id = module_id.into();
        identifier::validate("deviceId", &device_id)?;
        identifier::validate("moduleId", &module_id)?;

        Ok(Self {
            device_id,
            module_id,
            generation_id: None,
            etag: None,
            managed_by: None,
            connection_state: ConnectionState::Disconnected,
            connection_state_updated_time: None,
            last_activity_time: None,
            cloud_to_device_message_count: 0,
            authentication: AuthenticationMechanism::default(),
        })
    }

    /// Set the credentials.
    pub fn with_authentication(mut self, authentication: AuthenticationMechanism) -> Self {
        self.authentication = authentication;
        self
    }

    /// Set the managing party.
    pub fn with_managed_by(mut self, managed_by: impl Into<String>) -> Self {
        self.managed_by = Some(managed_by.into());
        self
    }

    /// Identifier of the owning device.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// The module identifier.
    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn generation_id(&self) -> Option<&str> {
        self.generation_id.as_deref()
    }

    /// Re-check identifier rules, e.g. after deserializing untrusted input.
    pub fn validate(&self) -> ValidationResult<()> {
        identifier::validate("deviceId", &self.device_id)?;
        identifier::validate("moduleId", &self.module_id)
    }
}

impl Versioned for Module {
    fn etag(&self) -> Option<&ETag> {
        self.etag.as_ref()
    }
}
