//! Automatic device management configurations.
//!
//! A configuration applies twin content to every device (or module) matching a
//! target condition, with a priority to break ties. Like identities and twins
//! it carries an ETag and is updated under the same precondition rules.

use super::etag::{self, ETag};
use super::identifier;
use super::precondition::Versioned;
use crate::error::ValidationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Content a configuration applies to matching targets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationContent {
    /// Device twin paths (e.g. `properties.desired.telemetry`) to values
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub device_content: Map<String, Value>,

    /// Edge deployment content keyed by module
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub modules_content: Map<String, Value>,

    /// Module twin paths to values
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub module_content: Map<String, Value>,
}

/// Named queries and their results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigurationMetrics {
    #[serde(default)]
    pub results: BTreeMap<String, i64>,

    #[serde(default)]
    pub queries: BTreeMap<String, String>,
}

/// An automatic device management configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    id: String,

    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub content: ConfigurationContent,

    #[serde(default)]
    pub target_condition: String,

    #[serde(default)]
    pub priority: i32,

    #[serde(
        default,
        deserialize_with = "etag::deserialize_optional",
        skip_serializing_if = "Option::is_none"
    )]
    etag: Option<ETag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time_utc: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_time_utc: Option<DateTime<Utc>>,

    #[serde(default)]
    pub metrics: ConfigurationMetrics,

    #[serde(default, skip_serializing)]
    pub system_metrics: ConfigurationMetrics,
}

fn default_schema_version() -> String {
    "1.0".to_string()
}

impl Configuration {
    /// Create a new, unversioned configuration.
    pub fn new(id: impl Into<String>) -> ValidationResult<Self> {
        let id = id.into();
        identifier::validate("configurationId", &id)?;

        Ok(Self {
            id,
            schema_version: default_schema_version(),
            labels: BTreeMap::new(),
            content: ConfigurationContent::default(),
            target_condition: String::new(),
            priority: 0,
            etag: None,
            created_time_utc: None,
            last_updated_time_utc: None,
            metrics: ConfigurationMetrics::default(),
            system_metrics: ConfigurationMetrics::default(),
        })
    }

    /// Restrict the configuration to twins matching `condition`.
    pub fn with_target_condition(mut self, condition: impl Into<String>) -> Self {
        self.target_condition = condition.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Apply `value` at a device twin path.
    pub fn with_device_content(mut self, path: impl Into<String>, value: Value) -> Self {
        self.content.device_content.insert(path.into(), value);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Re-check identifier rules, e.g. after deserializing untrusted input.
    pub fn validate(&self) -> ValidationResult<()> {
        identifier::validate("configurationId", &self.id)
    }
}

impl Versioned for Configuration {
    fn etag(&self) -> Option<&ETag> {
        self.etag.as_ref()
    }
}
