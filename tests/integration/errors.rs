//! Error mapping and local validation tests.

use crate::common::{CONNECTION_STRING, device, init_logging, registry_client};
use hub_registry::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use hub_registry::{ConcurrencyPolicy, RegistryClient, RegistryError, ValidationError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Answers every request with a fixed status and body, counting calls.
#[derive(Clone)]
struct FixedResponse {
    status: u16,
    body: &'static str,
    calls: Arc<AtomicUsize>,
}

impl FixedResponse {
    fn new(status: u16, body: &'static str) -> Self {
        Self {
            status,
            body,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl HttpTransport for FixedResponse {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse {
            status: self.status,
            headers: Vec::new(),
            body: self.body.to_string(),
        })
    }
}

/// Fails every request before it reaches a service.
struct Unreachable;

impl HttpTransport for Unreachable {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError::Connection {
            message: "connection refused".to_string(),
            endpoint: Some("test-hub.azure-devices.net".to_string()),
        })
    }
}

fn client_with<T: HttpTransport>(transport: T) -> RegistryClient<T> {
    init_logging();
    RegistryClient::builder()
        .connection_string(CONNECTION_STRING)
        .transport(transport)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_status_codes_map_to_variants() {
    let cases = [
        (401, 401),
        (404, 404),
        (409, 409),
        (412, 412),
        (429, 429),
        (500, 500),
        (503, 503),
    ];

    for (status, expected) in cases {
        let transport = FixedResponse::new(status, r#"{"Message":"ErrorCode:Test;detail"}"#);
        let client = client_with(transport.clone());

        let error = client.devices().get("d1").await.unwrap_err();
        assert_eq!(error.status(), Some(expected));
        assert!(error.to_string().contains("ErrorCode:Test;detail"));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1, "no retry for {status}");
    }
}

#[tokio::test]
async fn test_specific_variants() {
    let client = client_with(FixedResponse::new(429, "{}"));
    let error = client.devices().statistics().await.unwrap_err();
    assert!(matches!(error, RegistryError::Throttled { .. }));

    let client = client_with(FixedResponse::new(401, ""));
    let error = client.devices().statistics().await.unwrap_err();
    assert!(matches!(error, RegistryError::Unauthorized { .. }));

    let client = client_with(FixedResponse::new(502, "bad gateway"));
    let error = client.devices().statistics().await.unwrap_err();
    match error {
        RegistryError::Service { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "bad gateway");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_malformed_success_body_is_json_error() {
    let client = client_with(FixedResponse::new(200, "not json"));
    let error = client.devices().get("d1").await.unwrap_err();
    assert!(matches!(error, RegistryError::Json(_)));
}

#[tokio::test]
async fn test_transport_failure_surfaces() {
    let client = client_with(Unreachable);
    let error = client.devices().get("d1").await.unwrap_err();
    assert!(matches!(error, RegistryError::Transport(_)));
    assert_eq!(error.status(), None);
}

#[tokio::test]
async fn test_invalid_identifiers_fail_before_sending() {
    let transport = FixedResponse::new(200, "{}");
    let client = client_with(transport.clone());

    let error = client.devices().get("").await.unwrap_err();
    assert!(matches!(
        error,
        RegistryError::Validation(ValidationError::MissingIdentifier { .. })
    ));

    let error = client.modules().get("d1", "bad/module").await.unwrap_err();
    assert!(matches!(
        error,
        RegistryError::Validation(ValidationError::InvalidIdentifierCharacter { character: '/', .. })
    ));

    let long_id = "x".repeat(129);
    let error = client.devices().delete_by_id(&long_id).await.unwrap_err();
    assert!(matches!(
        error,
        RegistryError::Validation(ValidationError::IdentifierTooLong { .. })
    ));

    let error = client.devices().list(0).await.unwrap_err();
    assert!(matches!(error, RegistryError::Validation(_)));

    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_service_message_is_preserved() {
    let (client, _registry) = registry_client();
    client.devices().create(&device("d1")).await.unwrap();

    let error = client.devices().create(&device("d1")).await.unwrap_err();
    match error {
        RegistryError::Conflict { message } => {
            assert!(message.starts_with("ErrorCode:DeviceAlreadyExists"), "{message}");
            assert!(message.contains("d1"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_custom_transport_with_wildcard_fallback() {
    let transport = FixedResponse::new(200, r#"{"deviceId":"d1","etag":"AAAA"}"#);
    let client = client_with(transport.clone());

    let updated = client
        .devices()
        .update(&device("d1"), ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();
    assert_eq!(updated.device_id(), "d1");
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}
