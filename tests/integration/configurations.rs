//! Configuration lifecycle tests.

use crate::common::{configuration, registry_client};
use hub_registry::{ConcurrencyPolicy, RegistryError, Versioned};
use serde_json::json;

#[tokio::test]
async fn test_configuration_lifecycle() {
    let (client, registry) = registry_client();

    let created = client
        .configurations()
        .create(&configuration("telemetry-v1"))
        .await
        .unwrap();
    assert_eq!(created.id(), "telemetry-v1");
    assert!(created.etag().is_some());
    assert!(created.created_time_utc.is_some());
    assert_eq!(created.priority, 10);
    assert_eq!(created.labels.get("team").map(String::as_str), Some("firmware"));
    assert_eq!(
        created.content.device_content.get("properties.desired.telemetry"),
        Some(&json!({"interval": 30}))
    );

    let fetched = client.configurations().get("telemetry-v1").await.unwrap();
    assert_eq!(fetched.etag(), created.etag());

    let updated = client
        .configurations()
        .update(&fetched.clone().with_priority(20), ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();
    assert_eq!(updated.priority, 20);
    assert_eq!(updated.created_time_utc, created.created_time_utc);
    assert_ne!(updated.etag(), fetched.etag());

    let error = client
        .configurations()
        .delete(&fetched, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap_err();
    assert!(error.is_precondition_failed());

    client
        .configurations()
        .delete(&updated, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();
    assert_eq!(registry.stats().await.configuration_count, 0);
}

#[tokio::test]
async fn test_list_and_delete_by_id() {
    let (client, _registry) = registry_client();
    for id in ["a", "b", "c"] {
        client.configurations().create(&configuration(id)).await.unwrap();
    }

    assert_eq!(client.configurations().list(10).await.unwrap().len(), 3);
    assert_eq!(client.configurations().list(2).await.unwrap().len(), 2);

    client.configurations().delete_by_id("b").await.unwrap();
    let ids: Vec<String> = client
        .configurations()
        .list(10)
        .await
        .unwrap()
        .iter()
        .map(|c| c.id().to_string())
        .collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[tokio::test]
async fn test_duplicate_configuration_conflicts() {
    let (client, _registry) = registry_client();
    client.configurations().create(&configuration("dup")).await.unwrap();

    let error = client
        .configurations()
        .create(&configuration("dup"))
        .await
        .unwrap_err();
    assert!(matches!(error, RegistryError::Conflict { .. }));
}

#[tokio::test]
async fn test_missing_configuration() {
    let (client, _registry) = registry_client();
    assert!(client.configurations().get("nope").await.unwrap_err().is_not_found());
    assert!(client
        .configurations()
        .delete_by_id("nope")
        .await
        .unwrap_err()
        .is_not_found());
}
