//! Configuration operations.

use super::{RegistryClient, conditional};
use crate::error::{RegistryResult, ValidationError};
use crate::resource::Configuration;
use crate::resource::identifier;
use crate::resource::precondition::{ConcurrencyPolicy, Precondition};
use crate::transport::{HttpTransport, Method};
use log::info;

/// Operations on automatic device management configurations.
pub struct ConfigurationClient<T> {
    client: RegistryClient<T>,
}

impl<T: HttpTransport> ConfigurationClient<T> {
    pub(crate) fn new(client: RegistryClient<T>) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &str) -> RegistryResult<Configuration> {
        identifier::validate("configurationId", id)?;
        let request = self.client.request(Method::Get, ["configurations", id]);
        self.client.execute_json(request).await
    }

    /// List up to `max_count` configurations.
    pub async fn list(&self, max_count: usize) -> RegistryResult<Vec<Configuration>> {
        if max_count == 0 {
            return Err(ValidationError::custom("max_count must be at least 1").into());
        }
        let request = self
            .client
            .request(Method::Get, ["configurations"])
            .with_query("top", max_count.to_string());
        self.client.execute_json(request).await
    }

    /// Add a new configuration; fails with a conflict if the id is taken.
    pub async fn create(&self, configuration: &Configuration) -> RegistryResult<Configuration> {
        configuration.validate()?;
        let request = self
            .client
            .request(Method::Put, ["configurations", configuration.id()])
            .with_body(serde_json::to_value(configuration)?);

        let created: Configuration = self.client.execute_json(request).await?;
        info!("created configuration '{}'", created.id());
        Ok(created)
    }

    /// Create or replace a configuration under `policy`.
    pub async fn update(
        &self,
        configuration: &Configuration,
        policy: ConcurrencyPolicy,
    ) -> RegistryResult<Configuration> {
        configuration.validate()?;
        let precondition = self.client.precondition(policy, configuration)?;
        let request = self
            .client
            .request(Method::Put, ["configurations", configuration.id()])
            .with_body(serde_json::to_value(configuration)?);

        self.client
            .execute_json(conditional(request, &precondition))
            .await
    }

    pub async fn delete(
        &self,
        configuration: &Configuration,
        policy: ConcurrencyPolicy,
    ) -> RegistryResult<()> {
        configuration.validate()?;
        let precondition = self.client.precondition(policy, configuration)?;
        self.remove(configuration.id(), &precondition).await
    }

    /// Delete a configuration by id, regardless of its current version.
    pub async fn delete_by_id(&self, id: &str) -> RegistryResult<()> {
        identifier::validate("configurationId", id)?;
        self.remove(id, &Precondition::Any).await
    }

    async fn remove(&self, id: &str, precondition: &Precondition) -> RegistryResult<()> {
        let request = self.client.request(Method::Delete, ["configurations", id]);
        self.client
            .execute(conditional(request, precondition))
            .await?;
        info!("deleted configuration '{}'", id);
        Ok(())
    }
}
