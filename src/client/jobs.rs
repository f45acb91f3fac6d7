//! Bulk import/export jobs.
//!
//! Jobs run on the service. This client only submits job descriptors and
//! reads back their status; progress is observed by polling [`JobClient::get`].

use super::RegistryClient;
use crate::error::RegistryResult;
use crate::resource::JobProperties;
use crate::resource::identifier;
use crate::transport::{HttpTransport, Method};
use log::info;

/// Operations on import/export jobs.
pub struct JobClient<T> {
    client: RegistryClient<T>,
}

impl<T: HttpTransport> JobClient<T> {
    pub(crate) fn new(client: RegistryClient<T>) -> Self {
        Self { client }
    }

    /// Start exporting every identity to a blob container.
    pub async fn export_devices(
        &self,
        output_container_uri: &str,
        exclude_keys: bool,
    ) -> RegistryResult<JobProperties> {
        self.submit(JobProperties::export(output_container_uri, exclude_keys))
            .await
    }

    /// Start importing identities from one blob container, logging to another.
    pub async fn import_devices(
        &self,
        input_container_uri: &str,
        output_container_uri: &str,
    ) -> RegistryResult<JobProperties> {
        self.submit(JobProperties::import(input_container_uri, output_container_uri))
            .await
    }

    /// Submit a job descriptor.
    ///
    /// Unset blob names and storage authentication are filled with their
    /// defaults before the job is validated and sent.
    pub async fn submit(&self, job: JobProperties) -> RegistryResult<JobProperties> {
        let job = job.with_defaults();
        job.validate()?;

        let request = self
            .client
            .request(Method::Post, ["jobs", "create"])
            .with_body(serde_json::to_value(&job)?);
        let submitted: JobProperties = self.client.execute_json(request).await?;

        info!(
            "submitted {:?} job '{}' ({:?})",
            submitted.job_type,
            submitted.job_id.as_deref().unwrap_or_default(),
            submitted.status
        );
        Ok(submitted)
    }

    /// Fetch a job's current state.
    pub async fn get(&self, job_id: &str) -> RegistryResult<JobProperties> {
        identifier::validate("jobId", job_id)?;
        let request = self.client.request(Method::Get, ["jobs", job_id]);
        self.client.execute_json(request).await
    }

    /// List the registry's recent jobs.
    pub async fn list(&self) -> RegistryResult<Vec<JobProperties>> {
        let request = self.client.request(Method::Get, ["jobs"]);
        self.client.execute_json(request).await
    }

    /// Cancel a job that has not finished yet.
    pub async fn cancel(&self, job_id: &str) -> RegistryResult<()> {
        identifier::validate("jobId", job_id)?;
        let request = self.client.request(Method::Delete, ["jobs", job_id]);
        self.client.execute(request).await?;
        info!("cancelled job '{}'", job_id);
        Ok(())
    }
}
