//! Device identities.
//!
//! A [`Device`] is the registry's record of one physical or logical device:
//! its identifier, credentials, enablement status and a few service-maintained
//! counters. The service owns `etag` and `generationId`; everything else is
//! caller-editable and sent back on update.

use super::authentication::AuthenticationMechanism;
use super::etag::{self, ETag};
use super::identifier;
use super::precondition::Versioned;
use crate::error::ValidationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a device may connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceStatus {
    #[default]
    Enabled,
    Disabled,
}

/// Last observed connection state of a device or module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// Optional capabilities of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCapabilities {
    /// The device runs an edge runtime and may host modules.
    #[serde(default)]
    pub iot_edge: bool,
}

/// A device identity as stored in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    device_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    generation_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "etag::deserialize_optional",
        skip_serializing_if = "Option::is_none"
    )]
    etag: Option<ETag>,

    #[serde(default)]
    pub status: DeviceStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_updated_time: Option<DateTime<Utc>>,

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

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<DeviceCapabilities>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_scope: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_scopes: Vec<String>,
}

impl Device {
    /// Create a new, unversioned device with service-generated symmetric keys.
    pub fn new(device_id: impl Into<String>) -> ValidationResult<Self> {
        let device_id = device_id.into();
        identifier::validate("deviceId", &device_id)?;

        Ok(Self {
            device_id,
            generation_id: None,
            etag: None,
            status: DeviceStatus::Enabled,
            status_reason: None,
            status_updated_time: None,
            connection_state: ConnectionState::Disconnected,
            connection_state_updated_time: None,
            last_activity_time: None,
            cloud_to_device_message_count: 0,
            authentication: AuthenticationMechanism::default(),
            capabilities: None,
            device_scope: None,
            parent_scopes: Vec::new(),
        })
    }

    /// Set the credentials.
    pub fn with_authentication(mut self, authentication: AuthenticationMechanism) -> Self {
        self.authentication = authentication;
        self
    }

    /// Set the enablement status and an optional reason.
    pub fn with_status(mut self, status: DeviceStatus, reason: Option<String>) -> Self {
        self.status = status;
        self.status_reason = reason;
        self
    }

    /// Mark the device as an edge device.
    pub fn with_edge_capability(mut self, iot_edge: bool) -> Self {
        self.capabilities = Some(DeviceCapabilities { iot_edge });
        self
    }

    /// The device identifier.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Service-assigned generation, distinguishing re-created devices with the same id.
    pub fn generation_id(&self) -> Option<&str> {
        self.generation_id.as_deref()
    }

    /// Whether the device runs an edge runtime.
    pub fn is_edge(&self) -> bool {
        self.capabilities.is_some_and(|c| c.iot_edge)
    }

    /// Re-check identifier rules, e.g. after deserializing untrusted input.
    pub fn validate(&self) -> ValidationResult<()> {
        identifier::validate("deviceId", &self.device_id)
    }
}

impl Versioned for Device {
    fn etag(&self) -> Option<&ETag> {
        self.etag.as_ref()
    }
}
