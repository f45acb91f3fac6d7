//! Device identity operations.

use super::{RegistryClient, conditional};
use crate::error::{RegistryResult, ValidationError};
use crate::resource::identifier;
use crate::resource::precondition::{ConcurrencyPolicy, Precondition};
use crate::resource::{Device, RegistryStatistics};
use crate::transport::{HttpTransport, Method};
use log::info;

/// Operations on device identities.
pub struct DeviceClient<T> {
    client: RegistryClient<T>,
}

impl<T: HttpTransport> DeviceClient<T> {
    pub(crate) fn new(client: RegistryClient<T>) -> Self {
        Self { client }
    }

    /// Fetch a device identity, including its current ETag.
    pub async fn get(&self, device_id: &str) -> RegistryResult<Device> {
        identifier::validate("deviceId", device_id)?;
        let request = self.client.request(Method::Get, ["devices", device_id]);
        self.client.execute_json(request).await
    }

    /// List up to `max_count` device identities.
    pub async fn list(&self, max_count: usize) -> RegistryResult<Vec<Device>> {
        if max_count == 0 {
            return Err(ValidationError::custom("max_count must be at least 1").into());
        }
        let request = self
            .client
            .request(Method::Get, ["devices"])
            .with_query("top", max_count.to_string());
        self.client.execute_json(request).await
    }

    /// Register a new device.
    ///
    /// Sent without a precondition; fails with
    /// [`RegistryError::Conflict`](crate::RegistryError::Conflict) if the
    /// device already exists. Symmetric keys are generated by the service when
    /// none are supplied.
    pub async fn create(&self, device: &Device) -> RegistryResult<Device> {
        device.validate()?;
        let request = self
            .client
            .request(Method::Put, ["devices", device.device_id()])
            .with_body(serde_json::to_value(device)?);

        let created: Device = self.client.execute_json(request).await?;
        info!("created device '{}'", created.device_id());
        Ok(created)
    }

    /// Create or replace a device identity.
    ///
    /// The `If-Match` header is chosen by `policy` from the snapshot's ETag;
    /// see [`Precondition`]. With a wildcard precondition a missing device is
    /// created.
    pub async fn update(&self, device: &Device, policy: ConcurrencyPolicy) -> RegistryResult<Device> {
        device.validate()?;
        let precondition = self.client.precondition(policy, device)?;
        let request = self
            .client
            .request(Method::Put, ["devices", device.device_id()])
            .with_body(serde_json::to_value(device)?);

        self.client
            .execute_json(conditional(request, &precondition))
            .await
    }

    /// Delete a device identity, with its modules and twins.
    pub async fn delete(&self, device: &Device, policy: ConcurrencyPolicy) -> RegistryResult<()> {
        device.validate()?;
        let precondition = self.client.precondition(policy, device)?;
        self.remove(device.device_id(), &precondition).await
    }

    /// Delete a device identity by id, regardless of its current version.
    pub async fn delete_by_id(&self, device_id: &str) -> RegistryResult<()> {
        identifier::validate("deviceId", device_id)?;
        self.remove(device_id, &Precondition::Any).await
    }

    async fn remove(&self, device_id: &str, precondition: &Precondition) -> RegistryResult<()> {
        let request = self.client.request(Method::Delete, ["devices", device_id]);
        self.client
            .execute(conditional(request, precondition))
            .await?;
        info!("deleted device '{}'", device_id);
        Ok(())
    }

    /// Device counts for the whole registry.
    pub async fn statistics(&self) -> RegistryResult<RegistryStatistics> {
        let request = self.client.request(Method::Get, ["statistics", "devices"]);
        self.client.execute_json(request).await
    }
}
