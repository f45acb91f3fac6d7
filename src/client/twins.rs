//! Twin operations and twin queries.

use super::{RegistryClient, conditional};
use crate::error::{RegistryResult, ValidationError};
use crate::resource::identifier;
use crate::resource::precondition::ConcurrencyPolicy;
use crate::resource::query::{CONTINUATION_HEADER, MAX_ITEM_COUNT_HEADER, QueryPage};
use crate::resource::Twin;
use crate::transport::{HttpTransport, Method};
use serde_json::json;

/// Operations on device and module twins.
pub struct TwinClient<T> {
    client: RegistryClient<T>,
}

impl<T: HttpTransport> TwinClient<T> {
    pub(crate) fn new(client: RegistryClient<T>) -> Self {
        Self { client }
    }

    /// Fetch a device twin.
    pub async fn get(&self, device_id: &str) -> RegistryResult<Twin> {
        identifier::validate("deviceId", device_id)?;
        let request = self.client.request(Method::Get, ["twins", device_id]);
        self.client.execute_json(request).await
    }

    /// Fetch a module twin.
    pub async fn get_module(&self, device_id: &str, module_id: &str) -> RegistryResult<Twin> {
        identifier::validate("deviceId", device_id)?;
        identifier::validate("moduleId", module_id)?;
        let request = self
            .client
            .request(Method::Get, ["twins", device_id, "modules", module_id]);
        self.client.execute_json(request).await
    }

    /// Merge the twin's tags and desired properties into the stored twin.
    ///
    /// Keys set to `null` are removed. Reported properties are never sent.
    pub async fn update(&self, twin: &Twin, policy: ConcurrencyPolicy) -> RegistryResult<Twin> {
        self.write(Method::Patch, twin, policy).await
    }

    /// Replace the stored twin's tags and desired properties entirely.
    pub async fn replace(&self, twin: &Twin, policy: ConcurrencyPolicy) -> RegistryResult<Twin> {
        self.write(Method::Put, twin, policy).await
    }

    async fn write(&self, method: Method, twin: &Twin, policy: ConcurrencyPolicy) -> RegistryResult<Twin> {
        twin.validate()?;
        let precondition = self.client.precondition(policy, twin)?;

        let mut segments = vec!["twins", twin.device_id()];
        if let Some(module_id) = twin.module_id() {
            segments.extend(["modules", module_id]);
        }
        let request = self
            .client
            .request(method, segments)
            .with_body(twin.to_update_body());

        self.client
            .execute_json(conditional(request, &precondition))
            .await
    }

    /// Run a twin query and return one page of results.
    ///
    /// Pass the previous page's continuation token to fetch the next page.
    /// `page_size` caps the number of twins per page; the service default
    /// applies when it is `None`.
    pub async fn query(
        &self,
        sql: &str,
        page_size: Option<usize>,
        continuation: Option<&str>,
    ) -> RegistryResult<QueryPage<Twin>> {
        identifier::require("query", sql)?;
        if page_size == Some(0) {
            return Err(ValidationError::custom("page_size must be at least 1").into());
        }

        let mut request = self
            .client
            .request(Method::Post, ["devices", "query"])
            .with_body(json!({ "query": sql }));
        if let Some(page_size) = page_size {
            request = request.with_header(MAX_ITEM_COUNT_HEADER, page_size.to_string());
        }
        if let Some(token) = continuation.filter(|token| !token.is_empty()) {
            request = request.with_header(CONTINUATION_HEADER, token);
        }

        let response = self.client.execute(request).await?;
        let items: Vec<Twin> = serde_json::from_str(&response.body)?;
        let continuation = response
            .header(CONTINUATION_HEADER)
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        Ok(QueryPage {
            items,
            continuation,
        })
    }
}
