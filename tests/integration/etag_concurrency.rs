//! Optimistic concurrency scenarios.
//!
//! These tests follow one identity through competing writers and check both
//! what the caller observes and which `If-Match` values reached the service.

use crate::common::{CONNECTION_STRING, create_device, device, module, registry_client};
use futures::future::join_all;
use hub_registry::transport::Method;
use hub_registry::{
    ClientConfig, ConcurrencyPolicy, DeviceStatus, RegistryClient, RegistryError, ValidationError,
    Versioned,
};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Unconditional update of a fresh identity succeeds and changes the ETag.
#[tokio::test]
async fn test_unconditional_update_assigns_new_etag() {
    let (client, _registry) = registry_client();

    let created = create_device(&client, "scenario-a").await;
    let first = created.etag().cloned().expect("created device should carry an ETag");

    let updated = client
        .devices()
        .update(
            &created.with_status(DeviceStatus::Disabled, Some("maintenance".into())),
            ConcurrencyPolicy::Unconditional,
        )
        .await
        .expect("unconditional update should succeed");

    let second = updated.etag().cloned().expect("updated device should carry an ETag");
    assert_ne!(first, second);
    assert_eq!(updated.status, DeviceStatus::Disabled);
    assert_eq!(updated.status_reason.as_deref(), Some("maintenance"));
}

/// A stale copy updated with IfMatch is rejected, and not retried.
#[tokio::test]
async fn test_stale_copy_if_match_is_rejected() {
    let (client, registry) = registry_client();

    let original = create_device(&client, "scenario-b").await;
    let stale_copy = client.devices().get("scenario-b").await.unwrap();
    assert_eq!(original.etag(), stale_copy.etag());

    let fresh = client
        .devices()
        .update(&original.with_edge_capability(true), ConcurrencyPolicy::IfMatch)
        .await
        .expect("first writer should win");
    assert_ne!(fresh.etag(), stale_copy.etag());

    let before = registry.request_log().await.len();
    let error = client
        .devices()
        .update(
            &stale_copy.clone().with_status(DeviceStatus::Disabled, None),
            ConcurrencyPolicy::IfMatch,
        )
        .await
        .unwrap_err();

    assert!(error.is_precondition_failed(), "unexpected error: {error}");
    assert_eq!(error.status(), Some(412));

    // Exactly one request went out for the failed call.
    let log = registry.request_log().await;
    assert_eq!(log.len(), before + 1);
    let last = log.last().unwrap();
    assert_eq!(last.status, 412);
    assert_eq!(
        last.if_match.as_deref(),
        Some(format!("\"{}\"", stale_copy.etag().unwrap()).as_str())
    );

    // The first writer's state survives.
    let current = client.devices().get("scenario-b").await.unwrap();
    assert!(current.is_edge());
    assert_eq!(current.status, DeviceStatus::Enabled);
    assert_eq!(current.etag(), fresh.etag());
}

/// The same stale copy written unconditionally overwrites the first writer.
#[tokio::test]
async fn test_stale_copy_unconditional_overwrites() {
    let (client, registry) = registry_client();

    let original = create_device(&client, "scenario-c").await;
    let stale_copy = client.devices().get("scenario-c").await.unwrap();

    let intervening = client
        .devices()
        .update(&original.with_edge_capability(true), ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();

    let overwritten = client
        .devices()
        .update(
            &stale_copy.clone().with_status(DeviceStatus::Disabled, None),
            ConcurrencyPolicy::Unconditional,
        )
        .await
        .expect("unconditional write should be accepted");

    assert_ne!(overwritten.etag(), intervening.etag());
    assert_ne!(overwritten.etag(), stale_copy.etag());
    assert!(!overwritten.is_edge(), "intervening change should be discarded");
    assert_eq!(overwritten.status, DeviceStatus::Disabled);

    let last = registry.request_log().await.pop().unwrap();
    assert_eq!(last.method, Method::Put);
    assert_eq!(last.if_match.as_deref(), Some("*"));
}

/// IfMatch on a locally built snapshot falls back to the wildcard.
#[tokio::test]
async fn test_if_match_without_etag_sends_wildcard() {
    let (client, registry) = registry_client();
    create_device(&client, "no-etag").await;

    let local = device("no-etag").with_edge_capability(true);
    assert!(local.etag().is_none());

    let updated = client
        .devices()
        .update(&local, ConcurrencyPolicy::IfMatch)
        .await
        .expect("wildcard fallback should be accepted");
    assert!(updated.is_edge());

    let last = registry.request_log().await.pop().unwrap();
    assert_eq!(last.if_match.as_deref(), Some("*"));
}

/// A strict client refuses IfMatch without an ETag before sending anything.
#[tokio::test]
async fn test_strict_client_rejects_if_match_without_etag() {
    let (client, registry) = registry_client();
    let created = create_device(&client, "strict").await;

    let strict = RegistryClient::builder()
        .connection_string(CONNECTION_STRING)
        .config(ClientConfig::default().with_strict_preconditions(true))
        .transport(registry.clone())
        .build()
        .unwrap();
    let before = registry.stats().await.request_count;

    let local = device("strict").with_edge_capability(true);
    let error = strict
        .devices()
        .update(&local, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        RegistryError::Validation(ValidationError::MissingArgument { .. })
    ));
    let error = strict
        .devices()
        .delete(&local, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap_err();
    assert!(matches!(error, RegistryError::Validation(_)));
    assert_eq!(registry.stats().await.request_count, before);

    // Fetched snapshots and unconditional writes are unaffected.
    strict
        .devices()
        .update(&created, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();
    strict
        .devices()
        .update(&local, ConcurrencyPolicy::Unconditional)
        .await
        .unwrap();
}

/// Deleting with a stale ETag fails; the identity remains.
#[tokio::test]
async fn test_delete_with_stale_etag() {
    let (client, registry) = registry_client();

    let original = create_device(&client, "delete-me").await;
    client
        .devices()
        .update(&original.clone().with_edge_capability(true), ConcurrencyPolicy::Unconditional)
        .await
        .unwrap();

    let error = client
        .devices()
        .delete(&original, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap_err();
    assert!(matches!(error, RegistryError::PreconditionFailed { .. }));
    assert_eq!(registry.stats().await.device_count, 1);

    let current = client.devices().get("delete-me").await.unwrap();
    client
        .devices()
        .delete(&current, ConcurrencyPolicy::IfMatch)
        .await
        .expect("delete with current ETag should succeed");
    assert_eq!(registry.stats().await.device_count, 0);
}

/// Module identities are versioned independently of their device.
#[tokio::test]
async fn test_module_etag_independent_of_device() {
    let (client, _registry) = registry_client();

    let device = create_device(&client, "edge-1").await;
    let created = client.modules().create(&module("edge-1", "filter")).await.unwrap();
    let stale = created.clone();

    client
        .devices()
        .update(&device.with_edge_capability(true), ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();

    // The device write did not touch the module's ETag.
    let updated = client
        .modules()
        .update(&created.with_managed_by("iotEdge"), ConcurrencyPolicy::IfMatch)
        .await
        .expect("module ETag should still match");

    let error = client
        .modules()
        .update(&stale, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap_err();
    assert!(error.is_precondition_failed());
    assert_eq!(updated.managed_by.as_deref(), Some("iotEdge"));
}

/// Concurrent writers holding the same snapshot: exactly one IfMatch write wins.
#[tokio::test]
async fn test_concurrent_if_match_single_winner() {
    let (client, _registry) = registry_client();
    let snapshot = Arc::new(create_device(&client, "contended").await);

    let mut tasks = JoinSet::new();
    for writer in 0..8 {
        let client = client.clone();
        let snapshot = Arc::clone(&snapshot);
        tasks.spawn(async move {
            let device = snapshot
                .as_ref()
                .clone()
                .with_status(DeviceStatus::Disabled, Some(format!("writer {writer}")));
            client
                .devices()
                .update(&device, ConcurrencyPolicy::IfMatch)
                .await
        });
    }

    let mut winners = 0;
    let mut rejected = 0;
    while let Some(outcome) = tasks.join_next().await {
        match outcome.expect("task should not panic") {
            Ok(_) => winners += 1,
            Err(error) if error.is_precondition_failed() => rejected += 1,
            Err(error) => panic!("unexpected error: {error}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(rejected, 7);
}

/// Unconditional twin patches from one snapshot all land, each on its own version.
#[tokio::test]
async fn test_concurrent_unconditional_twin_patches_all_apply() {
    let (client, _registry) = registry_client();
    create_device(&client, "shared-twin").await;
    let snapshot = client.twins().get("shared-twin").await.unwrap();

    let patches = (0..5).map(|i| {
        let mut twin = snapshot.clone();
        twin.set_desired(format!("key{i}"), json!(i));
        let client = client.clone();
        async move {
            client
                .twins()
                .update(&twin, ConcurrencyPolicy::Unconditional)
                .await
        }
    });

    let mut versions: Vec<i64> = join_all(patches)
        .await
        .into_iter()
        .map(|outcome| outcome.expect("unconditional patch should apply").version().unwrap())
        .collect();
    versions.sort_unstable();
    versions.dedup();
    assert_eq!(versions.len(), 5);

    let merged = client.twins().get("shared-twin").await.unwrap();
    for i in 0..5 {
        assert_eq!(merged.desired(&format!("key{i}")), Some(&json!(i)));
    }
}
