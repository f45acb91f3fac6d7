//! Module identity lifecycle tests.

use crate::common::{create_device, module, registry_client};
use hub_registry::{ConcurrencyPolicy, RegistryError, Versioned};

#[tokio::test]
async fn test_module_lifecycle() {
    let (client, registry) = registry_client();
    create_device(&client, "gateway").await;

    let created = client.modules().create(&module("gateway", "relay")).await.unwrap();
    assert_eq!(created.device_id(), "gateway");
    assert_eq!(created.module_id(), "relay");
    assert!(created.etag().is_some());
    assert!(created.generation_id().is_some());

    client.modules().create(&module("gateway", "buffer")).await.unwrap();
    let modules = client.modules().list("gateway").await.unwrap();
    let ids: Vec<&str> = modules.iter().map(|m| m.module_id()).collect();
    assert_eq!(ids, vec!["buffer", "relay"]);

    let fetched = client.modules().get("gateway", "relay").await.unwrap();
    client
        .modules()
        .delete(&fetched, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();
    client.modules().delete_by_id("gateway", "buffer").await.unwrap();

    assert_eq!(registry.stats().await.module_count, 0);
    assert!(client.modules().list("gateway").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_module_requires_parent_device() {
    let (client, _registry) = registry_client();

    let error = client
        .modules()
        .create(&module("missing-parent", "m1"))
        .await
        .unwrap_err();
    assert!(error.is_not_found());

    let error = client.modules().list("missing-parent").await.unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_duplicate_module_conflicts() {
    let (client, _registry) = registry_client();
    create_device(&client, "gateway").await;
    client.modules().create(&module("gateway", "relay")).await.unwrap();

    let error = client
        .modules()
        .create(&module("gateway", "relay"))
        .await
        .unwrap_err();
    assert!(matches!(error, RegistryError::Conflict { .. }));
}

#[tokio::test]
async fn test_module_update_if_match() {
    let (client, _registry) = registry_client();
    create_device(&client, "gateway").await;
    let created = client.modules().create(&module("gateway", "relay")).await.unwrap();

    let updated = client
        .modules()
        .update(&created.clone().with_managed_by("iotEdge"), ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();
    assert_eq!(updated.managed_by.as_deref(), Some("iotEdge"));
    assert_ne!(updated.etag(), created.etag());
    assert_eq!(updated.generation_id(), created.generation_id());

    let error = client
        .modules()
        .delete(&created, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap_err();
    assert!(error.is_precondition_failed());
}
