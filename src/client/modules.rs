//! Module identity operations.

use super::{RegistryClient, conditional};
use crate::error::RegistryResult;
use crate::resource::Module;
use crate::resource::identifier;
use crate::resource::precondition::{ConcurrencyPolicy, Precondition};
use crate::transport::{HttpTransport, Method};
use log::info;

/// Operations on module identities.
pub struct ModuleClient<T> {
    client: RegistryClient<T>,
}

impl<T: HttpTransport> ModuleClient<T> {
    pub(crate) fn new(client: RegistryClient<T>) -> Self {
        Self { client }
    }

    /// Fetch a module identity.
    pub async fn get(&self, device_id: &str, module_id: &str) -> RegistryResult<Module> {
        identifier::validate("deviceId", device_id)?;
        identifier::validate("moduleId", module_id)?;
        let request = self
            .client
            .request(Method::Get, ["devices", device_id, "modules", module_id]);
        self.client.execute_json(request).await
    }

    /// List the modules of one device.
    pub async fn list(&self, device_id: &str) -> RegistryResult<Vec<Module>> {
        identifier::validate("deviceId", device_id)?;
        let request = self
            .client
            .request(Method::Get, ["devices", device_id, "modules"]);
        self.client.execute_json(request).await
    }

    /// Register a new module on an existing device.
    pub async fn create(&self, module: &Module) -> RegistryResult<Module> {
        module.validate()?;
        let request = self
            .client
            .request(Method::Put, path(module))
            .with_body(serde_json::to_value(module)?);

        let created: Module = self.client.execute_json(request).await?;
        info!(
            "created module '{}/{}'",
            created.device_id(),
            created.module_id()
        );
        Ok(created)
    }

    /// Create or replace a module identity under `policy`.
    pub async fn update(&self, module: &Module, policy: ConcurrencyPolicy) -> RegistryResult<Module> {
        module.validate()?;
        let precondition = self.client.precondition(policy, module)?;
        let request = self
            .client
            .request(Method::Put, path(module))
            .with_body(serde_json::to_value(module)?);

        self.client
            .execute_json(conditional(request, &precondition))
            .await
    }

    /// Delete a module identity under `policy`.
    pub async fn delete(&self, module: &Module, policy: ConcurrencyPolicy) -> RegistryResult<()> {
        module.validate()?;
        let precondition = self.client.precondition(policy, module)?;
        self.remove(module.device_id(), module.module_id(), &precondition)
            .await
    }

    /// Delete a module identity by id, regardless of its current version.
    pub async fn delete_by_id(&self, device_id: &str, module_id: &str) -> RegistryResult<()> {
        identifier::validate("deviceId", device_id)?;
        identifier::validate("moduleId", module_id)?;
        self.remove(device_id, module_id, &Precondition::Any).await
    }

    async fn remove(
        &self,
        device_id: &str,
        module_id: &str,
        precondition: &Precondition,
    ) -> RegistryResult<()> {
        let request = self
            .client
            .request(Method::Delete, ["devices", device_id, "modules", module_id]);
        self.client
            .execute(conditional(request, precondition))
            .await?;
        info!("deleted module '{}/{}'", device_id, module_id);
        Ok(())
    }
}

fn path(module: &Module) -> [&str; 4] {
    ["devices", module.device_id(), "modules", module.module_id()]
}
