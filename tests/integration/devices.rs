//! Device identity lifecycle tests.

use crate::common::{create_device, device, registry_client};
use hub_registry::resource::{AuthenticationMechanism, AuthenticationType};
use hub_registry::{ConcurrencyPolicy, DeviceStatus, RegistryError, Versioned};

#[tokio::test]
async fn test_create_get_list_delete() {
    let (client, registry) = registry_client();

    let created = create_device(&client, "thermostat-1").await;
    assert_eq!(created.device_id(), "thermostat-1");
    assert!(created.generation_id().is_some());
    assert!(created.etag().is_some());

    let fetched = client.devices().get("thermostat-1").await.unwrap();
    assert_eq!(fetched.etag(), created.etag());
    assert_eq!(fetched.generation_id(), created.generation_id());

    create_device(&client, "thermostat-2").await;
    let devices = client.devices().list(10).await.unwrap();
    let ids: Vec<&str> = devices.iter().map(|d| d.device_id()).collect();
    assert_eq!(ids, vec!["thermostat-1", "thermostat-2"]);

    let first_only = client.devices().list(1).await.unwrap();
    assert_eq!(first_only.len(), 1);

    client.devices().delete_by_id("thermostat-1").await.unwrap();
    assert_eq!(registry.stats().await.device_count, 1);

    let error = client.devices().get("thermostat-1").await.unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_service_generates_symmetric_keys() {
    let (client, _registry) = registry_client();

    let created = create_device(&client, "keyless").await;
    let keys = created
        .authentication
        .symmetric_key
        .as_ref()
        .expect("service should generate keys");
    assert!(keys.primary_key.as_deref().is_some_and(|key| !key.is_empty()));
    assert_ne!(keys.primary_key, keys.secondary_key);
    assert_eq!(created.authentication.authentication_type, AuthenticationType::Sas);
}

#[tokio::test]
async fn test_supplied_keys_are_kept() {
    let (client, _registry) = registry_client();

    let supplied = device("with-keys").with_authentication(AuthenticationMechanism::symmetric_key(
        "cHJpbWFyeQ==",
        "c2Vjb25kYXJ5",
    ));
    let created = client.devices().create(&supplied).await.unwrap();
    let keys = created.authentication.symmetric_key.unwrap();
    assert_eq!(keys.primary_key.as_deref(), Some("cHJpbWFyeQ=="));
    assert_eq!(keys.secondary_key.as_deref(), Some("c2Vjb25kYXJ5"));
}

#[tokio::test]
async fn test_create_existing_device_conflicts() {
    let (client, _registry) = registry_client();
    create_device(&client, "dup").await;

    let error = client.devices().create(&device("dup")).await.unwrap_err();
    assert!(matches!(error, RegistryError::Conflict { .. }));
    assert_eq!(error.status(), Some(409));
}

#[tokio::test]
async fn test_unconditional_update_creates_missing_device() {
    let (client, registry) = registry_client();

    let created = client
        .devices()
        .update(&device("upserted"), ConcurrencyPolicy::Unconditional)
        .await
        .unwrap();
    assert!(created.etag().is_some());
    assert_eq!(registry.stats().await.device_count, 1);
}

#[tokio::test]
async fn test_update_preserves_generation_id() {
    let (client, _registry) = registry_client();
    let created = create_device(&client, "gen").await;

    let updated = client
        .devices()
        .update(
            &created.clone().with_status(DeviceStatus::Disabled, None),
            ConcurrencyPolicy::IfMatch,
        )
        .await
        .unwrap();
    assert_eq!(updated.generation_id(), created.generation_id());
    assert_eq!(
        updated.authentication.symmetric_key,
        created.authentication.symmetric_key
    );
}

#[tokio::test]
async fn test_statistics() {
    let (client, _registry) = registry_client();

    let empty = client.devices().statistics().await.unwrap();
    assert_eq!(empty.total_device_count, 0);

    create_device(&client, "a").await;
    create_device(&client, "b").await;
    let disabled = device("c").with_status(DeviceStatus::Disabled, Some("retired".into()));
    client.devices().create(&disabled).await.unwrap();

    let stats = client.devices().statistics().await.unwrap();
    assert_eq!(stats.total_device_count, 3);
    assert_eq!(stats.enabled_device_count, 2);
    assert_eq!(stats.disabled_device_count, 1);
}

#[tokio::test]
async fn test_delete_missing_device_is_not_found() {
    let (client, _registry) = registry_client();
    let error = client.devices().delete_by_id("ghost").await.unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_ids_with_reserved_url_characters() {
    let (client, _registry) = registry_client();

    let created = create_device(&client, "plant#3:line(2)").await;
    let fetched = client.devices().get("plant#3:line(2)").await.unwrap();
    assert_eq!(fetched.device_id(), created.device_id());
}
