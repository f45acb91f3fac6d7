//! Device and module twins.
//!
//! A twin is a JSON document paired 1:1 with a device or module identity. It
//! holds service-side `tags`, `desired` properties written by back-end
//! applications, and `reported` properties written by the device. Twins are
//! versioned with their own ETag, independent of the identity's.

use super::etag::{self, ETag};
use super::identifier;
use super::precondition::Versioned;
use crate::error::ValidationResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// A JSON object of twin properties or tags.
pub type TwinCollection = Map<String, Value>;

/// Desired and reported property sections.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TwinProperties {
    #[serde(default)]
    pub desired: TwinCollection,

    #[serde(default)]
    pub reported: TwinCollection,
}

/// A device or module twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Twin {
    device_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    module_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "etag::deserialize_optional",
        skip_serializing_if = "Option::is_none"
    )]
    etag: Option<ETag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<i64>,

    #[serde(default)]
    pub tags: TwinCollection,

    #[serde(default)]
    pub properties: TwinProperties,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_state: Option<String>,
}

impl Twin {
    /// Create an unversioned twin for a device.
    pub fn new(device_id: impl Into<String>) -> ValidationResult<Self> {
        let device_id = device_id.into();
        identifier::validate("deviceId", &device_id)?;
        Ok(Self::empty(device_id, None))
    }

    /// Create an unversioned twin for a module.
    pub fn for_module(
        device_id: impl Into<String>,
        module_id: impl Into<String>,
    ) -> ValidationResult<Self> {
        let device_id = device_id.into();
        let module_id = module_id.into();
        identifier::validate("deviceId", &device_id)?;
        identifier::validate("moduleId", &module_id)?;
        Ok(Self::empty(device_id, Some(module_id)))
    }

    fn empty(device_id: String, module_id: Option<String>) -> Self {
        Self {
            device_id,
            module_id,
            etag: None,
            version: None,
            tags: TwinCollection::new(),
            properties: TwinProperties::default(),
            status: None,
            connection_state: None,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn module_id(&self) -> Option<&str> {
        self.module_id.as_deref()
    }

    /// Monotonic twin version maintained by the service.
    pub fn version(&self) -> Option<i64> {
        self.version
    }

    /// Set a tag.
    pub fn set_tag(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.tags.insert(key.into(), value);
        self
    }

    /// Set a desired property.
    pub fn set_desired(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.properties.desired.insert(key.into(), value);
        self
    }

    /// A desired property, if present.
    pub fn desired(&self, key: &str) -> Option<&Value> {
        self.properties.desired.get(key)
    }

    /// A reported property, if present.
    pub fn reported(&self, key: &str) -> Option<&Value> {
        self.properties.reported.get(key)
    }

    /// The `$version` of the desired section.
    pub fn desired_version(&self) -> Option<i64> {
        self.properties.desired.get("$version").and_then(Value::as_i64)
    }

    /// Body sent on update/replace: tags and desired properties without
    /// service metadata. Reported properties are device-owned and never sent.
    pub fn to_update_body(&self) -> Value {
        let desired: TwinCollection = self
            .properties
            .desired
            .iter()
            .filter(|(key, _)| !key.starts_with('$'))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        json!({
            "tags": self.tags,
            "properties": { "desired": desired },
        })
    }

    /// Re-check identifier rules, e.g. after deserializing untrusted input.
    pub fn validate(&self) -> ValidationResult<()> {
        identifier::validate("deviceId", &self.device_id)?;
        match &self.module_id {
            Some(module_id) => identifier::validate("moduleId", module_id),
            None => Ok(()),
        }
    }
}

impl Versioned for Twin {
    fn etag(&self) -> Option<&ETag> {
        self.etag.as_ref()
    }
}
