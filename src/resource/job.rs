//! Bulk import/export job descriptors.
//!
//! A job asks the service to stream the whole identity registry to (export) or
//! from (import) a blob container. The client only submits the descriptor and
//! observes the status resource the service keeps for it; it never executes,
//! polls or retries jobs itself.
//!
//! ```rust
//! use hub_registry::resource::job::{JobProperties, StorageAuthenticationType};
//!
//! let job = JobProperties::export("https://acct.blob.core.windows.net/c?sv=sig", false)
//!     .with_defaults();
//! assert_eq!(job.output_blob_name.as_deref(), Some("devices.txt"));
//! assert_eq!(job.storage_authentication_type, Some(StorageAuthenticationType::KeyBased));
//! ```

use super::identifier;
use crate::error::ValidationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Blob name used when the caller does not choose one.
pub const DEFAULT_BLOB_NAME: &str = "devices.txt";

/// Kind of bulk job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobType {
    Export,
    Import,
    #[serde(other)]
    Unknown,
}

/// Service-side lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobStatus {
    #[default]
    Unknown,
    Enqueued,
    Queued,
    Scheduled,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether the service will not change this job's status again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// How the service authenticates against the blob container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageAuthenticationType {
    /// Shared access signature embedded in the container URI
    #[default]
    KeyBased,
    /// The registry's managed identity
    IdentityBased,
}

/// A bulk job request, and the status the service reports for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    #[serde(rename = "type")]
    pub job_type: JobType,

    #[serde(default)]
    pub status: JobStatus,

    #[serde(default)]
    pub progress: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_blob_container_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_blob_container_uri: Option<String>,

    #[serde(default)]
    pub exclude_keys_in_export: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_authentication_type: Option<StorageAuthenticationType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_blob_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_blob_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_utc: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_utc: Option<DateTime<Utc>>,
}

impl JobProperties {
    fn blank(job_type: JobType) -> Self {
        Self {
            job_id: None,
            job_type,
            status: JobStatus::Unknown,
            progress: 0,
            input_blob_container_uri: None,
            output_blob_container_uri: None,
            exclude_keys_in_export: false,
            storage_authentication_type: None,
            input_blob_name: None,
            output_blob_name: None,
            failure_reason: None,
            start_time_utc: None,
            end_time_utc: None,
        }
    }

    /// Export every identity to `container_uri`.
    ///
    /// With `exclude_keys` set, authentication keys are blanked in the output.
    pub fn export(container_uri: impl Into<String>, exclude_keys: bool) -> Self {
        Self {
            output_blob_container_uri: Some(container_uri.into()),
            exclude_keys_in_export: exclude_keys,
            ..Self::blank(JobType::Export)
        }
    }

    /// Import identities from `input_uri`, writing a result log to `output_uri`.
    pub fn import(input_uri: impl Into<String>, output_uri: impl Into<String>) -> Self {
        Self {
            input_blob_container_uri: Some(input_uri.into()),
            output_blob_container_uri: Some(output_uri.into()),
            ..Self::blank(JobType::Import)
        }
    }

    /// Choose the blob the export writes (or the import reads).
    pub fn with_blob_name(mut self, blob_name: impl Into<String>) -> Self {
        match self.job_type {
            JobType::Import => self.input_blob_name = Some(blob_name.into()),
            _ => self.output_blob_name = Some(blob_name.into()),
        }
        self
    }

    /// Choose how the service authenticates to storage.
    pub fn with_storage_authentication(mut self, auth: StorageAuthenticationType) -> Self {
        self.storage_authentication_type = Some(auth);
        self
    }

    /// Fill unset optional fields with their defaults: blob name
    /// [`DEFAULT_BLOB_NAME`] and key-based storage authentication.
    pub fn with_defaults(mut self) -> Self {
        match self.job_type {
            JobType::Import => {
                self.input_blob_name
                    .get_or_insert_with(|| DEFAULT_BLOB_NAME.to_string());
            }
            _ => {
                self.output_blob_name
                    .get_or_insert_with(|| DEFAULT_BLOB_NAME.to_string());
            }
        }
        self.storage_authentication_type
            .get_or_insert(StorageAuthenticationType::KeyBased);
        self
    }

    /// Check the fields the service requires for this job type.
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(job_id) = &self.job_id {
            identifier::validate("jobId", job_id)?;
        }
        let output = self.output_blob_container_uri.as_deref().unwrap_or_default();
        identifier::require("outputBlobContainerUri", output)?;
        if self.job_type == JobType::Import {
            let input = self.input_blob_container_uri.as_deref().unwrap_or_default();
            identifier::require("inputBlobContainerUri", input)?;
        }
        Ok(())
    }
}
