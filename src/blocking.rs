//! Blocking wrappers around the async clients.
//!
//! Each blocking client owns (a share of) a current-thread Tokio runtime and
//! drives the corresponding async operation to completion on the calling
//! thread. Do not call these from inside an async context; the runtime will
//! refuse to nest.
//!
//! ```rust
//! use hub_registry::blocking::BlockingRegistryClient;
//! use hub_registry::transport::InMemoryRegistry;
//! use hub_registry::{ConcurrencyPolicy, Device, RegistryClient};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RegistryClient::builder()
//!     .connection_string("HostName=hub.example.net;SharedAccessKeyName=owner;SharedAccessKey=c2VjcmV0")
//!     .transport(InMemoryRegistry::new())
//!     .build()?;
//! let client = BlockingRegistryClient::new(client)?;
//!
//! let device = client.devices().create(&Device::new("d1")?)?;
//! client.devices().delete(&device, ConcurrencyPolicy::IfMatch)?;
//! # Ok(())
//! # }
//! ```

use crate::client::RegistryClient;
use crate::error::{BuildError, BuildResult, RegistryError, RegistryResult};
use crate::resource::{
    ConcurrencyPolicy, Configuration, Device, JobProperties, Module, QueryPage,
    RegistryStatistics, Twin,
};
use crate::transport::{HttpTransport, ReqwestTransport};
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Synchronous facade over [`RegistryClient`].
pub struct BlockingRegistryClient<T = ReqwestTransport> {
    client: RegistryClient<T>,
    runtime: Arc<Runtime>,
}

impl<T> Clone for BlockingRegistryClient<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            runtime: Arc::clone(&self.runtime),
        }
    }
}

impl BlockingRegistryClient<ReqwestTransport> {
    /// Create an HTTPS client with default configuration.
    pub fn from_connection_string(connection_string: &str) -> BuildResult<Self> {
        let client = RegistryClient::from_connection_string(connection_string)?;
        Self::new(client).map_err(|e| BuildError::InvalidConfig {
            message: e.to_string(),
        })
    }
}

impl<T: HttpTransport> BlockingRegistryClient<T> {
    /// Wrap an async client, starting a private runtime for it.
    pub fn new(client: RegistryClient<T>) -> RegistryResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RegistryError::config(format!("failed to start runtime: {}", e)))?;
        Ok(Self {
            client,
            runtime: Arc::new(runtime),
        })
    }

    /// The wrapped async client.
    pub fn inner(&self) -> &RegistryClient<T> {
        &self.client
    }

    pub fn devices(&self) -> BlockingDeviceClient<'_, T> {
        BlockingDeviceClient { parent: self }
    }

    pub fn modules(&self) -> BlockingModuleClient<'_, T> {
        BlockingModuleClient { parent: self }
    }

    pub fn twins(&self) -> BlockingTwinClient<'_, T> {
        BlockingTwinClient { parent: self }
    }

    pub fn jobs(&self) -> BlockingJobClient<'_, T> {
        BlockingJobClient { parent: self }
    }

    pub fn configurations(&self) -> BlockingConfigurationClient<'_, T> {
        BlockingConfigurationClient { parent: self }
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Blocking counterpart of [`DeviceClient`](crate::client::DeviceClient).
pub struct BlockingDeviceClient<'a, T> {
    parent: &'a BlockingRegistryClient<T>,
}

impl<T: HttpTransport> BlockingDeviceClient<'_, T> {
    pub fn get(&self, device_id: &str) -> RegistryResult<Device> {
        let devices = self.parent.client.devices();
        self.parent.block_on(devices.get(device_id))
    }

    pub fn list(&self, max_count: usize) -> RegistryResult<Vec<Device>> {
        let devices = self.parent.client.devices();
        self.parent.block_on(devices.list(max_count))
    }

    pub fn create(&self, device: &Device) -> RegistryResult<Device> {
        let devices = self.parent.client.devices();
        self.parent.block_on(devices.create(device))
    }

    pub fn update(&self, device: &Device, policy: ConcurrencyPolicy) -> RegistryResult<Device> {
        let devices = self.parent.client.devices();
        self.parent.block_on(devices.update(device, policy))
    }

    pub fn delete(&self, device: &Device, policy: ConcurrencyPolicy) -> RegistryResult<()> {
        let devices = self.parent.client.devices();
        self.parent.block_on(devices.delete(device, policy))
    }

    pub fn delete_by_id(&self, device_id: &str) -> RegistryResult<()> {
        let devices = self.parent.client.devices();
        self.parent.block_on(devices.delete_by_id(device_id))
    }

    pub fn statistics(&self) -> RegistryResult<RegistryStatistics> {
        let devices = self.parent.client.devices();
        self.parent.block_on(devices.statistics())
    }
}

/// Blocking counterpart of [`ModuleClient`](crate::client::ModuleClient).
pub struct BlockingModuleClient<'a, T> {
    parent: &'a BlockingRegistryClient<T>,
}

impl<T: HttpTransport> BlockingModuleClient<'_, T> {
    pub fn get(&self, device_id: &str, module_id: &str) -> RegistryResult<Module> {
        let modules = self.parent.client.modules();
        self.parent.block_on(modules.get(device_id, module_id))
    }

    pub fn list(&self, device_id: &str) -> RegistryResult<Vec<Module>> {
        let modules = self.parent.client.modules();
        self.parent.block_on(modules.list(device_id))
    }

    pub fn create(&self, module: &Module) -> RegistryResult<Module> {
        let modules = self.parent.client.modules();
        self.parent.block_on(modules.create(module))
    }

    pub fn update(&self, module: &Module, policy: ConcurrencyPolicy) -> RegistryResult<Module> {
        let modules = self.parent.client.modules();
        self.parent.block_on(modules.update(module, policy))
    }

    pub fn delete(&self, module: &Module, policy: ConcurrencyPolicy) -> RegistryResult<()> {
        let modules = self.parent.client.modules();
        self.parent.block_on(modules.delete(module, policy))
    }

    pub fn delete_by_id(&self, device_id: &str, module_id: &str) -> RegistryResult<()> {
        let modules = self.parent.client.modules();
        self.parent.block_on(modules.delete_by_id(device_id, module_id))
    }
}

/// Blocking counterpart of [`TwinClient`](crate::client::TwinClient).
pub struct BlockingTwinClient<'a, T> {
    parent: &'a BlockingRegistryClient<T>,
}

impl<T: HttpTransport> BlockingTwinClient<'_, T> {
    pub fn get(&self, device_id: &str) -> RegistryResult<Twin> {
        let twins = self.parent.client.twins();
        self.parent.block_on(twins.get(device_id))
    }

    pub fn get_module(&self, device_id: &str, module_id: &str) -> RegistryResult<Twin> {
        let twins = self.parent.client.twins();
        self.parent.block_on(twins.get_module(device_id, module_id))
    }

    pub fn update(&self, twin: &Twin, policy: ConcurrencyPolicy) -> RegistryResult<Twin> {
        let twins = self.parent.client.twins();
        self.parent.block_on(twins.update(twin, policy))
    }

    pub fn replace(&self, twin: &Twin, policy: ConcurrencyPolicy) -> RegistryResult<Twin> {
        let twins = self.parent.client.twins();
        self.parent.block_on(twins.replace(twin, policy))
    }

    pub fn query(
        &self,
        sql: &str,
        page_size: Option<usize>,
        continuation: Option<&str>,
    ) -> RegistryResult<QueryPage<Twin>> {
        let twins = self.parent.client.twins();
        self.parent.block_on(twins.query(sql, page_size, continuation))
    }
}

/// Blocking counterpart of [`JobClient`](crate::client::JobClient).
pub struct BlockingJobClient<'a, T> {
    parent: &'a BlockingRegistryClient<T>,
}

impl<T: HttpTransport> BlockingJobClient<'_, T> {
    pub fn export_devices(
        &self,
        output_container_uri: &str,
        exclude_keys: bool,
    ) -> RegistryResult<JobProperties> {
        let jobs = self.parent.client.jobs();
        self.parent
            .block_on(jobs.export_devices(output_container_uri, exclude_keys))
    }

    pub fn import_devices(
        &self,
        input_container_uri: &str,
        output_container_uri: &str,
    ) -> RegistryResult<JobProperties> {
        let jobs = self.parent.client.jobs();
        self.parent
            .block_on(jobs.import_devices(input_container_uri, output_container_uri))
    }

    pub fn submit(&self, job: JobProperties) -> RegistryResult<JobProperties> {
        let jobs = self.parent.client.jobs();
        self.parent.block_on(jobs.submit(job))
    }

    pub fn get(&self, job_id: &str) -> RegistryResult<JobProperties> {
        let jobs = self.parent.client.jobs();
        self.parent.block_on(jobs.get(job_id))
    }

    pub fn list(&self) -> RegistryResult<Vec<JobProperties>> {
        let jobs = self.parent.client.jobs();
        self.parent.block_on(jobs.list())
    }

    pub fn cancel(&self, job_id: &str) -> RegistryResult<()> {
        let jobs = self.parent.client.jobs();
        self.parent.block_on(jobs.cancel(job_id))
    }
}

/// Blocking counterpart of [`ConfigurationClient`](crate::client::ConfigurationClient).
pub struct BlockingConfigurationClient<'a, T> {
    parent: &'a BlockingRegistryClient<T>,
}

impl<T: HttpTransport> BlockingConfigurationClient<'_, T> {
    pub fn get(&self, id: &str) -> RegistryResult<Configuration> {
        let configurations = self.parent.client.configurations();
        self.parent.block_on(configurations.get(id))
    }

    pub fn list(&self, max_count: usize) -> RegistryResult<Vec<Configuration>> {
        let configurations = self.parent.client.configurations();
        self.parent.block_on(configurations.list(max_count))
    }

    pub fn create(&self, configuration: &Configuration) -> RegistryResult<Configuration> {
        let configurations = self.parent.client.configurations();
        self.parent.block_on(configurations.create(configuration))
    }

    pub fn update(
        &self,
        configuration: &Configuration,
        policy: ConcurrencyPolicy,
    ) -> RegistryResult<Configuration> {
        let configurations = self.parent.client.configurations();
        self.parent
            .block_on(configurations.update(configuration, policy))
    }

    pub fn delete(
        &self,
        configuration: &Configuration,
        policy: ConcurrencyPolicy,
    ) -> RegistryResult<()> {
        let configurations = self.parent.client.configurations();
        self.parent
            .block_on(configurations.delete(configuration, policy))
    }

    pub fn delete_by_id(&self, id: &str) -> RegistryResult<()> {
        let configurations = self.parent.client.configurations();
        self.parent.block_on(configurations.delete_by_id(id))
    }
}
