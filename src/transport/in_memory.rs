//! In-process simulation of the registry service.
//!
//! [`InMemoryRegistry`] implements [`HttpTransport`] by answering requests the
//! way the remote registry does, so that resource clients can be exercised end
//! to end without a network. It is meant for tests and offline development.
//!
//! # Behavior
//!
//! * Every successful mutation assigns a fresh ETag derived from the stored
//!   content and a registry-wide generation counter, so a write never reuses a
//!   previous stamp.
//! * `If-Match` is evaluated under the write lock, making each conditional
//!   write an atomic compare-and-swap:
//!   - no header on PUT: create only, `409` if the resource exists
//!   - `*`: create or replace
//!   - `"<etag>"`: replace only if the current ETag matches, else `412`;
//!     `404` if the resource does not exist
//! * Deleting a device removes its modules and twins.
//! * Jobs are recorded as `enqueued` and never executed.
//! * The request log keeps the most recent [`REQUEST_LOG_CAPACITY`] entries;
//!   the request count in [`InMemoryRegistry::stats`] covers every request.
//! * Twin queries support `SELECT * FROM devices` and
//!   `SELECT * FROM devices.modules`, paged with continuation tokens.
//!
//! # Example Usage
//!
//! ```rust
//! use hub_registry::transport::{HttpRequest, HttpTransport, InMemoryRegistry, Method};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = InMemoryRegistry::new();
//!
//! let create = HttpRequest::new(Method::Put, ["devices", "d1"])
//!     .with_query("api-version", "2021-04-12")
//!     .with_header("Authorization", "SharedAccessSignature sr=test")
//!     .with_body(json!({"deviceId": "d1"}));
//! let response = registry.send(create).await?;
//! assert_eq!(response.status, 200);
//!
//! let stats = registry.stats().await;
//! assert_eq!(stats.device_count, 1);
//! # Ok(())
//! # }
//! ```

use super::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};
use crate::resource::etag::ETag;
use crate::resource::precondition::IF_MATCH_HEADER;
use crate::resource::query::{CONTINUATION_HEADER, MAX_ITEM_COUNT_HEADER};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::Utc;
use log::debug;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_LIST_SIZE: usize = 1000;

/// Number of recent requests kept in the request log.
pub const REQUEST_LOG_CAPACITY: usize = 1024;

/// A request as observed by the simulated service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub if_match: Option<String>,
    pub status: u16,
}

/// Counts of what the simulated registry currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InMemoryRegistryStats {
    pub device_count: usize,
    pub module_count: usize,
    pub configuration_count: usize,
    pub job_count: usize,
    pub request_count: usize,
}

/// Thread-safe simulated registry service.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryRegistry {
    state: Arc<RwLock<RegistryState>>,
}

#[derive(Default)]
struct RegistryState {
    devices: BTreeMap<String, DeviceEntry>,
    configurations: BTreeMap<String, Value>,
    jobs: BTreeMap<String, Value>,
    generation: u64,
    requests: VecDeque<RecordedRequest>,
    request_count: usize,
}

struct DeviceEntry {
    identity: Value,
    twin: Value,
    modules: BTreeMap<String, ModuleEntry>,
}

struct ModuleEntry {
    identity: Value,
    twin: Value,
}

/// A service-side failure, rendered as the service's JSON error body.
#[derive(Debug)]
struct Fault {
    status: u16,
    code: &'static str,
    message: String,
}

impl Fault {
    fn new(status: u16, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn not_found(code: &'static str, what: &str) -> Self {
        Self::new(404, code, format!("{} not found", what))
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, "ArgumentInvalid", message)
    }

    fn into_response(self) -> HttpResponse {
        HttpResponse::json(
            self.status,
            &json!({
                "Message": format!("ErrorCode:{};{}", self.code, self.message),
                "ExceptionMessage": "",
            }),
        )
    }
}

type Outcome = Result<HttpResponse, Fault>;

/// The `If-Match` header as the service understands it.
#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Absent,
    Any,
    Tag(ETag),
}

enum WriteKind {
    Create,
    Replace,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts of stored resources and handled requests.
    pub async fn stats(&self) -> InMemoryRegistryStats {
        let state = self.state.read().await;
        InMemoryRegistryStats {
            device_count: state.devices.len(),
            module_count: state.devices.values().map(|d| d.modules.len()).sum(),
            configuration_count: state.configurations.len(),
            job_count: state.jobs.len(),
            request_count: state.request_count,
        }
    }

    /// The most recent requests, oldest first.
    pub async fn request_log(&self) -> Vec<RecordedRequest> {
        self.state.read().await.requests.iter().cloned().collect()
    }

    /// Drop all resources, jobs and the request log.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = RegistryState::default();
    }

    /// Set a job's status, simulating progress made by the service.
    ///
    /// Returns `false` if the job does not exist.
    pub async fn set_job_status(&self, job_id: &str, status: &str) -> bool {
        let mut state = self.state.write().await;
        match state.jobs.get_mut(job_id) {
            Some(job) => {
                job["status"] = json!(status);
                if matches!(status, "completed" | "failed" | "cancelled") {
                    job["endTimeUtc"] = json!(Utc::now().to_rfc3339());
                    if status == "completed" {
                        job["progress"] = json!(100);
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Overwrite reported properties of a device twin, as a device would.
    ///
    /// Returns `false` if the device does not exist.
    pub async fn report_properties(&self, device_id: &str, reported: Value) -> bool {
        let mut state = self.state.write().await;
        let RegistryState {
            devices,
            generation,
            ..
        } = &mut *state;
        match devices.get_mut(device_id) {
            Some(entry) => {
                merge(&mut entry.twin["properties"]["reported"], &reported);
                bump_section_version(&mut entry.twin["properties"]["reported"]);
                bump_twin_version(&mut entry.twin);
                stamp(generation, &mut entry.twin);
                true
            }
            None => false,
        }
    }

    async fn handle(&self, request: &HttpRequest) -> Outcome {
        authorize(request)?;

        let segments: Vec<&str> = request.segments.iter().map(String::as_str).collect();
        let mut state = self.state.write().await;

        match (request.method, segments.as_slice()) {
            (Method::Get, ["statistics", "devices"]) => Ok(state.statistics()),

            (Method::Get, ["devices"]) => Ok(state.list_devices(list_limit(request)?)),
            (Method::Post, ["devices", "query"]) => state.query(request),
            (Method::Get, ["devices", id]) => state.get_device(id),
            (Method::Put, ["devices", id]) => state.put_device(id, request),
            (Method::Delete, ["devices", id]) => state.delete_device(id, request),

            (Method::Get, ["devices", id, "modules"]) => state.list_modules(id),
            (Method::Get, ["devices", id, "modules", module]) => state.get_module(id, module),
            (Method::Put, ["devices", id, "modules", module]) => {
                state.put_module(id, module, request)
            }
            (Method::Delete, ["devices", id, "modules", module]) => {
                state.delete_module(id, module, request)
            }

            (Method::Get, ["twins", id]) => state.get_twin(id, None),
            (Method::Get, ["twins", id, "modules", module]) => state.get_twin(id, Some(*module)),
            (Method::Patch | Method::Put, ["twins", id]) => state.write_twin(id, None, request),
            (Method::Patch | Method::Put, ["twins", id, "modules", module]) => {
                state.write_twin(id, Some(*module), request)
            }

            (Method::Post, ["jobs", "create"]) => state.create_job(request),
            (Method::Get, ["jobs"]) => Ok(state.list_jobs()),
            (Method::Get, ["jobs", id]) => state.get_job(id),
            (Method::Delete, ["jobs", id]) => state.cancel_job(id),

            (Method::Get, ["configurations"]) => {
                Ok(state.list_configurations(list_limit(request)?))
            }
            (Method::Get, ["configurations", id]) => state.get_configuration(id),
            (Method::Put, ["configurations", id]) => state.put_configuration(id, request),
            (Method::Delete, ["configurations", id]) => state.delete_configuration(id, request),

            _ => Err(Fault::new(
                404,
                "RouteNotFound",
                format!("no route for {} {}", request.method, request.path()),
            )),
        }
    }

    async fn record(&self, request: &HttpRequest, status: u16) {
        let mut state = self.state.write().await;
        if state.requests.len() == REQUEST_LOG_CAPACITY {
            state.requests.pop_front();
        }
        state.requests.push_back(RecordedRequest {
            method: request.method,
            path: request.path(),
            if_match: request.header(IF_MATCH_HEADER).map(str::to_string),
            status,
        });
        state.request_count += 1;
    }
}

impl HttpTransport for InMemoryRegistry {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = match self.handle(&request).await {
            Ok(response) => response,
            Err(fault) => fault.into_response(),
        };
        debug!(
            "in-memory registry: {} {} -> {}",
            request.method,
            request.path(),
            response.status
        );
        self.record(&request, response.status).await;
        Ok(response)
    }
}

impl RegistryState {
    fn statistics(&self) -> HttpResponse {
        let total = self.devices.len();
        let disabled = self
            .devices
            .values()
            .filter(|entry| entry.identity["status"] == "disabled")
            .count();

        HttpResponse::json(
            200,
            &json!({
                "totalDeviceCount": total,
                "enabledDeviceCount": total - disabled,
                "disabledDeviceCount": disabled,
            }),
        )
    }

    fn list_devices(&self, limit: usize) -> HttpResponse {
        let devices: Vec<&Value> = self
            .devices
            .values()
            .take(limit)
            .map(|entry| &entry.identity)
            .collect();
        HttpResponse::json(200, &json!(devices))
    }

    fn get_device(&self, id: &str) -> Outcome {
        self.devices
            .get(id)
            .map(|entry| HttpResponse::json(200, &entry.identity))
            .ok_or_else(|| Fault::not_found("DeviceNotFound", &format!("Device '{}'", id)))
    }

    fn put_device(&mut self, id: &str, request: &HttpRequest) -> Outcome {
        let mut body = object_body(request)?;
        require_field(&body, "deviceId", id)?;

        let condition = condition(request)?;
        let existing = self.devices.get(id).map(|entry| &entry.identity);
        let kind = decide_write(&condition, existing, "DeviceAlreadyExists", "DeviceNotFound", id)?;

        let now = Utc::now().to_rfc3339();
        match kind {
            WriteKind::Create => {
                prepare_identity(&mut body, &now);
                stamp(&mut self.generation, &mut body);

                let mut twin = new_twin(id, None);
                twin["status"] = body["status"].clone();
                stamp(&mut self.generation, &mut twin);

                self.devices.insert(
                    id.to_string(),
                    DeviceEntry {
                        identity: body.clone(),
                        twin,
                        modules: BTreeMap::new(),
                    },
                );
            }
            WriteKind::Replace => {
                let RegistryState {
                    devices,
                    generation,
                    ..
                } = self;
                let entry = devices.get_mut(id).ok_or_else(|| {
                    Fault::not_found("DeviceNotFound", &format!("Device '{}'", id))
                })?;
                carry_service_fields(&entry.identity, &mut body, &now);
                stamp(generation, &mut body);
                entry.twin["status"] = body["status"].clone();
                entry.identity = body.clone();
            }
        }

        Ok(HttpResponse::json(200, &body))
    }

    fn delete_device(&mut self, id: &str, request: &HttpRequest) -> Outcome {
        let condition = condition(request)?;
        let existing = self.devices.get(id).map(|entry| &entry.identity);
        check_existing(&condition, existing, "DeviceNotFound", id)?;
        self.devices.remove(id);
        Ok(HttpResponse::empty(204))
    }

    fn device_entry(&self, id: &str) -> Result<&DeviceEntry, Fault> {
        self.devices
            .get(id)
            .ok_or_else(|| Fault::not_found("DeviceNotFound", &format!("Device '{}'", id)))
    }

    fn list_modules(&self, id: &str) -> Outcome {
        let entry = self.device_entry(id)?;
        let modules: Vec<&Value> = entry.modules.values().map(|m| &m.identity).collect();
        Ok(HttpResponse::json(200, &json!(modules)))
    }

    fn get_module(&self, id: &str, module: &str) -> Outcome {
        self.device_entry(id)?
            .modules
            .get(module)
            .map(|entry| HttpResponse::json(200, &entry.identity))
            .ok_or_else(|| {
                Fault::not_found("ModuleNotFound", &format!("Module '{}/{}'", id, module))
            })
    }

    fn put_module(&mut self, id: &str, module: &str, request: &HttpRequest) -> Outcome {
        let mut body = object_body(request)?;
        require_field(&body, "deviceId", id)?;
        require_field(&body, "moduleId", module)?;

        let condition = condition(request)?;
        let RegistryState {
            devices,
            generation,
            ..
        } = self;
        let device = devices
            .get_mut(id)
            .ok_or_else(|| Fault::not_found("DeviceNotFound", &format!("Device '{}'", id)))?;

        let existing = device.modules.get(module).map(|entry| &entry.identity);
        let target = format!("{}/{}", id, module);
        let kind = decide_write(
            &condition,
            existing,
            "ModuleAlreadyExistsOnDevice",
            "ModuleNotFound",
            &target,
        )?;

        let now = Utc::now().to_rfc3339();
        match kind {
            WriteKind::Create => {
                prepare_identity(&mut body, &now);
                if let Some(object) = body.as_object_mut() {
                    object.remove("status");
                }
                stamp(generation, &mut body);

                let mut twin = new_twin(id, Some(module));
                stamp(generation, &mut twin);
                device.modules.insert(
                    module.to_string(),
                    ModuleEntry {
                        identity: body.clone(),
                        twin,
                    },
                );
            }
            WriteKind::Replace => {
                let entry = device.modules.get_mut(module).ok_or_else(|| {
                    Fault::not_found("ModuleNotFound", &format!("Module '{}'", target))
                })?;
                carry_service_fields(&entry.identity, &mut body, &now);
                stamp(generation, &mut body);
                entry.identity = body.clone();
            }
        }

        Ok(HttpResponse::json(200, &body))
    }

    fn delete_module(&mut self, id: &str, module: &str, request: &HttpRequest) -> Outcome {
        let condition = condition(request)?;
        let device = self
            .devices
            .get_mut(id)
            .ok_or_else(|| Fault::not_found("DeviceNotFound", &format!("Device '{}'", id)))?;
        let existing = device.modules.get(module).map(|entry| &entry.identity);
        check_existing(
            &condition,
            existing,
            "ModuleNotFound",
            &format!("{}/{}", id, module),
        )?;
        device.modules.remove(module);
        Ok(HttpResponse::empty(204))
    }

    fn twin_mut<'a>(
        devices: &'a mut BTreeMap<String, DeviceEntry>,
        id: &str,
        module: Option<&str>,
    ) -> Result<&'a mut Value, Fault> {
        let device = devices
            .get_mut(id)
            .ok_or_else(|| Fault::not_found("DeviceNotFound", &format!("Device '{}'", id)))?;
        match module {
            None => Ok(&mut device.twin),
            Some(module) => device
                .modules
                .get_mut(module)
                .map(|entry| &mut entry.twin)
                .ok_or_else(|| {
                    Fault::not_found("ModuleNotFound", &format!("Module '{}/{}'", id, module))
                }),
        }
    }

    fn get_twin(&mut self, id: &str, module: Option<&str>) -> Outcome {
        let twin = Self::twin_mut(&mut self.devices, id, module)?;
        Ok(HttpResponse::json(200, twin))
    }

    fn write_twin(&mut self, id: &str, module: Option<&str>, request: &HttpRequest) -> Outcome {
        let body = object_body(request)?;
        let condition = condition(request)?;

        let RegistryState {
            devices,
            generation,
            ..
        } = self;
        let twin = Self::twin_mut(devices, id, module)?;
        check_existing(&condition, Some(&*twin), "DeviceNotFound", id)?;

        let empty = Value::Object(Map::new());
        let tags = body.get("tags").unwrap_or(&empty);
        let desired = body
            .get("properties")
            .and_then(|p| p.get("desired"))
            .unwrap_or(&empty);

        if request.method == Method::Patch {
            merge(&mut twin["tags"], tags);
            merge(&mut twin["properties"]["desired"], desired);
        } else {
            twin["tags"] = strip_nulls(tags);
            let section_version = twin["properties"]["desired"]["$version"].clone();
            twin["properties"]["desired"] = strip_nulls(desired);
            twin["properties"]["desired"]["$version"] = section_version;
        }
        bump_section_version(&mut twin["properties"]["desired"]);
        bump_twin_version(twin);
        stamp(generation, twin);

        Ok(HttpResponse::json(200, twin))
    }

    fn query(&self, request: &HttpRequest) -> Outcome {
        let body = object_body(request)?;
        let sql = body
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| Fault::bad_request("query text is required"))?;
        let normalized = sql.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();

        let twins: Vec<&Value> = match normalized.as_str() {
            "select * from devices" => self.devices.values().map(|d| &d.twin).collect(),
            "select * from devices.modules" => self
                .devices
                .values()
                .flat_map(|d| d.modules.values().map(|m| &m.twin))
                .collect(),
            _ => {
                return Err(Fault::bad_request(format!(
                    "unsupported query '{}'",
                    sql
                )));
            }
        };

        let page_size = match request.header(MAX_ITEM_COUNT_HEADER) {
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|size| *size > 0)
                .ok_or_else(|| Fault::bad_request("invalid max item count"))?,
            None => DEFAULT_PAGE_SIZE,
        };
        let offset = match request.header(CONTINUATION_HEADER) {
            Some(token) => decode_continuation(token)?,
            None => 0,
        };

        let page: Vec<&Value> = twins.iter().skip(offset).take(page_size).copied().collect();
        let mut response = HttpResponse::json(200, &json!(page));
        let next = offset + page.len();
        if next < twins.len() {
            response = response.with_header(CONTINUATION_HEADER, encode_continuation(next));
        }
        Ok(response)
    }

    fn create_job(&mut self, request: &HttpRequest) -> Outcome {
        let mut job = object_body(request)?;
        let job_type = job
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Fault::bad_request("job type is required"))?
            .to_string();

        let has = |field: &str| {
            job.get(field)
                .and_then(Value::as_str)
                .is_some_and(|value| !value.trim().is_empty())
        };
        match job_type.as_str() {
            "export" if has("outputBlobContainerUri") => {}
            "import" if has("inputBlobContainerUri") && has("outputBlobContainerUri") => {}
            "export" | "import" => {
                return Err(Fault::bad_request("blob container URI is required"));
            }
            other => return Err(Fault::bad_request(format!("unknown job type '{}'", other))),
        }

        let job_id = match job.get("jobId").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        if self.jobs.contains_key(&job_id) {
            return Err(Fault::new(
                409,
                "JobAlreadyExists",
                format!("Job '{}' already exists", job_id),
            ));
        }

        job["jobId"] = json!(job_id);
        job["status"] = json!("enqueued");
        job["progress"] = json!(0);
        job["startTimeUtc"] = json!(Utc::now().to_rfc3339());
        self.jobs.insert(job_id, job.clone());

        Ok(HttpResponse::json(200, &job))
    }

    fn list_jobs(&self) -> HttpResponse {
        let jobs: Vec<&Value> = self.jobs.values().collect();
        HttpResponse::json(200, &json!(jobs))
    }

    fn get_job(&self, id: &str) -> Outcome {
        self.jobs
            .get(id)
            .map(|job| HttpResponse::json(200, job))
            .ok_or_else(|| Fault::not_found("JobNotFound", &format!("Job '{}'", id)))
    }

    fn cancel_job(&mut self, id: &str) -> Outcome {
        let job = self
            .jobs
            .get_mut(id)
            .ok_or_else(|| Fault::not_found("JobNotFound", &format!("Job '{}'", id)))?;
        let terminal = matches!(
            job["status"].as_str(),
            Some("completed" | "failed" | "cancelled")
        );
        if !terminal {
            job["status"] = json!("cancelled");
            job["endTimeUtc"] = json!(Utc::now().to_rfc3339());
        }
        Ok(HttpResponse::empty(204))
    }

    fn list_configurations(&self, limit: usize) -> HttpResponse {
        let configurations: Vec<&Value> = self.configurations.values().take(limit).collect();
        HttpResponse::json(200, &json!(configurations))
    }

    fn get_configuration(&self, id: &str) -> Outcome {
        self.configurations
            .get(id)
            .map(|config| HttpResponse::json(200, config))
            .ok_or_else(|| {
                Fault::not_found("ConfigurationNotFound", &format!("Configuration '{}'", id))
            })
    }

    fn put_configuration(&mut self, id: &str, request: &HttpRequest) -> Outcome {
        let mut body = object_body(request)?;
        require_field(&body, "id", id)?;

        let condition = condition(request)?;
        let existing = self.configurations.get(id);
        let kind = decide_write(
            &condition,
            existing,
            "ConfigurationAlreadyExists",
            "ConfigurationNotFound",
            id,
        )?;

        let now = Utc::now().to_rfc3339();
        let created = match (&kind, existing) {
            (WriteKind::Replace, Some(current)) => current["createdTimeUtc"].clone(),
            _ => json!(now),
        };
        body["createdTimeUtc"] = created;
        body["lastUpdatedTimeUtc"] = json!(now);
        body["systemMetrics"] = json!({"results": {}, "queries": {}});
        stamp(&mut self.generation, &mut body);
        self.configurations.insert(id.to_string(), body.clone());

        Ok(HttpResponse::json(200, &body))
    }

    fn delete_configuration(&mut self, id: &str, request: &HttpRequest) -> Outcome {
        let condition = condition(request)?;
        check_existing(
            &condition,
            self.configurations.get(id),
            "ConfigurationNotFound",
            id,
        )?;
        self.configurations.remove(id);
        Ok(HttpResponse::empty(204))
    }
}

fn authorize(request: &HttpRequest) -> Result<(), Fault> {
    match request.header("Authorization") {
        Some(token) if token.starts_with("SharedAccessSignature ") => {}
        _ => {
            return Err(Fault::new(
                401,
                "IotHubUnauthorizedAccess",
                "missing or malformed shared access signature",
            ));
        }
    }
    if request.query_param("api-version").is_none() {
        return Err(Fault::bad_request("api-version query parameter is required"));
    }
    Ok(())
}

fn list_limit(request: &HttpRequest) -> Result<usize, Fault> {
    match request.query_param("top") {
        Some(top) => top
            .parse()
            .map_err(|_| Fault::bad_request(format!("invalid top '{}'", top))),
        None => Ok(DEFAULT_LIST_SIZE),
    }
}

fn object_body(request: &HttpRequest) -> Result<Value, Fault> {
    match &request.body {
        Some(body @ Value::Object(_)) => Ok(body.clone()),
        _ => Err(Fault::bad_request("a JSON object body is required")),
    }
}

fn require_field(body: &Value, field: &str, expected: &str) -> Result<(), Fault> {
    if body.get(field).and_then(Value::as_str) == Some(expected) {
        Ok(())
    } else {
        Err(Fault::bad_request(format!(
            "'{}' in body must match '{}' in path",
            field, expected
        )))
    }
}

fn condition(request: &HttpRequest) -> Result<Condition, Fault> {
    match request.header(IF_MATCH_HEADER) {
        None => Ok(Condition::Absent),
        Some(value) if value.trim() == "*" => Ok(Condition::Any),
        Some(value) => ETag::parse(value)
            .map(Condition::Tag)
            .map_err(|e| Fault::bad_request(format!("malformed If-Match header: {}", e))),
    }
}

fn etag_of(value: &Value) -> Option<ETag> {
    value.get("etag").and_then(Value::as_str).and_then(ETag::new)
}

fn precondition_failed(target: &str, expected: &ETag, current: Option<ETag>) -> Fault {
    Fault::new(
        412,
        "PreconditionFailed",
        format!(
            "Precondition failed for '{}': expected etag '{}', current '{}'",
            target,
            expected,
            current.map(|etag| etag.to_string()).unwrap_or_default()
        ),
    )
}

fn decide_write(
    condition: &Condition,
    existing: Option<&Value>,
    exists_code: &'static str,
    missing_code: &'static str,
    target: &str,
) -> Result<WriteKind, Fault> {
    match (condition, existing) {
        (Condition::Absent, None) | (Condition::Any, None) => Ok(WriteKind::Create),
        (Condition::Absent, Some(_)) => Err(Fault::new(
            409,
            exists_code,
            format!("'{}' already exists", target),
        )),
        (Condition::Any, Some(_)) => Ok(WriteKind::Replace),
        (Condition::Tag(_), None) => Err(Fault::not_found(missing_code, &format!("'{}'", target))),
        (Condition::Tag(expected), Some(current)) => {
            let current = etag_of(current);
            if current.as_ref() == Some(expected) {
                Ok(WriteKind::Replace)
            } else {
                Err(precondition_failed(target, expected, current))
            }
        }
    }
}

fn check_existing(
    condition: &Condition,
    existing: Option<&Value>,
    missing_code: &'static str,
    target: &str,
) -> Result<(), Fault> {
    let current = existing.ok_or_else(|| Fault::not_found(missing_code, &format!("'{}'", target)))?;
    match condition {
        Condition::Tag(expected) => {
            let current = etag_of(current);
            if current.as_ref() == Some(expected) {
                Ok(())
            } else {
                Err(precondition_failed(target, expected, current))
            }
        }
        Condition::Absent | Condition::Any => Ok(()),
    }
}

/// Assign a fresh ETag to `value`.
fn stamp(generation: &mut u64, value: &mut Value) {
    *generation += 1;
    if let Some(object) = value.as_object_mut() {
        object.remove("etag");
    }
    let etag = ETag::from_content(value.to_string().as_bytes(), *generation);
    value["etag"] = json!(etag.as_str());
}

fn generated_key() -> String {
    BASE64.encode(Uuid::new_v4().as_bytes())
}

/// Fill service-owned fields of a newly created identity.
fn prepare_identity(body: &mut Value, now: &str) {
    body["generationId"] = json!(Uuid::new_v4().simple().to_string());
    body["connectionState"] = json!("Disconnected");
    body["connectionStateUpdatedTime"] = json!(now);
    body["cloudToDeviceMessageCount"] = json!(0);
    if body.get("status").is_none() {
        body["status"] = json!("enabled");
    }
    body["statusUpdatedTime"] = json!(now);

    if lacks_keys(body) {
        body["authentication"] = json!({
            "type": "sas",
            "symmetricKey": {
                "primaryKey": generated_key(),
                "secondaryKey": generated_key(),
            }
        });
    }
}

/// Keep service-owned fields across a replace.
fn carry_service_fields(current: &Value, body: &mut Value, now: &str) {
    for field in [
        "generationId",
        "connectionState",
        "connectionStateUpdatedTime",
        "lastActivityTime",
        "cloudToDeviceMessageCount",
    ] {
        if let Some(value) = current.get(field) {
            body[field] = value.clone();
        }
    }
    if body.get("status") != current.get("status") {
        body["statusUpdatedTime"] = json!(now);
    } else if let Some(value) = current.get("statusUpdatedTime") {
        body["statusUpdatedTime"] = value.clone();
    }
    if lacks_keys(body) {
        if let Some(current_auth) = current.get("authentication") {
            body["authentication"] = current_auth.clone();
        }
    }
}

/// Whether an identity asks for symmetric-key auth without supplying keys.
fn lacks_keys(body: &Value) -> bool {
    match body.get("authentication") {
        None | Some(Value::Null) => true,
        Some(auth) => {
            auth.get("type").and_then(Value::as_str).unwrap_or("sas") == "sas"
                && auth
                    .get("symmetricKey")
                    .and_then(|key| key.get("primaryKey"))
                    .and_then(Value::as_str)
                    .is_none()
        }
    }
}

fn new_twin(device_id: &str, module_id: Option<&str>) -> Value {
    let mut twin = json!({
        "deviceId": device_id,
        "version": 1,
        "tags": {},
        "properties": {
            "desired": {"$version": 1},
            "reported": {"$version": 1},
        },
        "connectionState": "Disconnected",
    });
    if let Some(module_id) = module_id {
        twin["moduleId"] = json!(module_id);
    }
    twin
}

fn bump_twin_version(twin: &mut Value) {
    let version = twin["version"].as_i64().unwrap_or(0);
    twin["version"] = json!(version + 1);
}

fn bump_section_version(section: &mut Value) {
    let version = section["$version"].as_i64().unwrap_or(0);
    section["$version"] = json!(version + 1);
}

/// JSON merge patch: objects merge recursively, `null` removes a key.
fn merge(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(entries) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Some(object) = target.as_object_mut() {
                for (key, value) in entries {
                    if value.is_null() {
                        object.remove(key);
                    } else {
                        merge(object.entry(key.clone()).or_insert(Value::Null), value);
                    }
                }
            }
        }
        other => *target = other.clone(),
    }
}

fn strip_nulls(value: &Value) -> Value {
    let mut result = Value::Object(Map::new());
    merge(&mut result, value);
    result
}

fn encode_continuation(offset: usize) -> String {
    BASE64.encode(format!("offset:{}", offset))
}

fn decode_continuation(token: &str) -> Result<usize, Fault> {
    BASE64
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .and_then(|text| text.strip_prefix("offset:").and_then(|n| n.parse().ok()))
        .ok_or_else(|| Fault::bad_request("invalid continuation token"))
}
