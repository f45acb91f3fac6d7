//! Twin read, update, replace and query tests.

use crate::common::{create_device, module, registry_client};
use hub_registry::{ConcurrencyPolicy, Versioned};
use serde_json::{Value, json};

#[tokio::test]
async fn test_twin_created_with_identity() {
    let (client, _registry) = registry_client();
    create_device(&client, "sensor").await;

    let twin = client.twins().get("sensor").await.unwrap();
    assert_eq!(twin.device_id(), "sensor");
    assert!(twin.module_id().is_none());
    assert!(twin.etag().is_some());
    assert_eq!(twin.version(), Some(1));
    assert!(twin.tags.is_empty());
}

#[tokio::test]
async fn test_update_merges_tags_and_desired() {
    let (client, _registry) = registry_client();
    create_device(&client, "sensor").await;

    let mut twin = client.twins().get("sensor").await.unwrap();
    twin.set_tag("site", json!("north"))
        .set_tag("floor", json!(3))
        .set_desired("interval", json!(30));
    let first = client
        .twins()
        .update(&twin, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();
    assert_eq!(first.version(), Some(2));
    assert_eq!(first.desired("interval"), Some(&json!(30)));
    assert_ne!(first.etag(), twin.etag());

    // A patch only names what changes; null removes.
    let mut patch = first.clone();
    patch.tags.clear();
    patch.set_tag("floor", Value::Null);
    let second = client
        .twins()
        .update(&patch, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();
    assert_eq!(second.tags.get("site"), Some(&json!("north")));
    assert!(second.tags.get("floor").is_none());
    assert_eq!(second.desired("interval"), Some(&json!(30)));
    assert!(second.desired_version() > first.desired_version());
}

#[tokio::test]
async fn test_replace_drops_unlisted_properties() {
    let (client, _registry) = registry_client();
    create_device(&client, "sensor").await;

    let mut twin = client.twins().get("sensor").await.unwrap();
    twin.set_tag("site", json!("north")).set_desired("interval", json!(30));
    let patched = client
        .twins()
        .update(&twin, ConcurrencyPolicy::Unconditional)
        .await
        .unwrap();

    let mut replacement = patched.clone();
    replacement.tags.clear();
    replacement.properties.desired.clear();
    replacement.set_desired("mode", json!("eco"));
    let replaced = client
        .twins()
        .replace(&replacement, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();

    assert!(replaced.tags.is_empty());
    assert!(replaced.desired("interval").is_none());
    assert_eq!(replaced.desired("mode"), Some(&json!("eco")));
}

#[tokio::test]
async fn test_stale_twin_update_rejected() {
    let (client, _registry) = registry_client();
    create_device(&client, "sensor").await;

    let mut first = client.twins().get("sensor").await.unwrap();
    let mut stale = first.clone();

    first.set_desired("interval", json!(10));
    client
        .twins()
        .update(&first, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();

    stale.set_desired("interval", json!(99));
    let error = client
        .twins()
        .update(&stale, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap_err();
    assert!(error.is_precondition_failed());

    let current = client.twins().get("sensor").await.unwrap();
    assert_eq!(current.desired("interval"), Some(&json!(10)));
}

#[tokio::test]
async fn test_reported_properties_are_not_sent() {
    let (client, registry) = registry_client();
    create_device(&client, "sensor").await;
    assert!(registry.report_properties("sensor", json!({"firmware": "1.2.0"})).await);

    let mut twin = client.twins().get("sensor").await.unwrap();
    assert_eq!(twin.reported("firmware"), Some(&json!("1.2.0")));

    twin.properties
        .reported
        .insert("firmware".to_string(), json!("tampered"));
    twin.set_desired("firmware", json!("1.3.0"));
    let updated = client
        .twins()
        .update(&twin, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();

    assert_eq!(updated.reported("firmware"), Some(&json!("1.2.0")));
    assert_eq!(updated.desired("firmware"), Some(&json!("1.3.0")));
}

#[tokio::test]
async fn test_module_twin() {
    let (client, _registry) = registry_client();
    create_device(&client, "gateway").await;
    client.modules().create(&module("gateway", "relay")).await.unwrap();

    let mut twin = client.twins().get_module("gateway", "relay").await.unwrap();
    assert_eq!(twin.module_id(), Some("relay"));

    twin.set_desired("route", json!("upstream"));
    let updated = client
        .twins()
        .update(&twin, ConcurrencyPolicy::IfMatch)
        .await
        .unwrap();
    assert_eq!(updated.module_id(), Some("relay"));
    assert_eq!(updated.desired("route"), Some(&json!("upstream")));

    // The device twin is untouched.
    let device_twin = client.twins().get("gateway").await.unwrap();
    assert!(device_twin.desired("route").is_none());
}

#[tokio::test]
async fn test_query_pages_through_all_twins() {
    let (client, _registry) = registry_client();
    for id in ["d1", "d2", "d3", "d4", "d5"] {
        create_device(&client, id).await;
    }

    let mut seen = Vec::new();
    let mut continuation: Option<String> = None;
    let mut pages = 0;
    loop {
        let page = client
            .twins()
            .query("SELECT * FROM devices", Some(2), continuation.as_deref())
            .await
            .unwrap();
        pages += 1;
        assert!(page.items.len() <= 2);
        seen.extend(page.items.iter().map(|t| t.device_id().to_string()));
        if !page.has_more() {
            break;
        }
        continuation = page.continuation;
    }

    assert_eq!(pages, 3);
    assert_eq!(seen, vec!["d1", "d2", "d3", "d4", "d5"]);
}

#[tokio::test]
async fn test_query_single_page_without_page_size() {
    let (client, _registry) = registry_client();
    create_device(&client, "only").await;

    let page = client
        .twins()
        .query("select * from devices", None, None)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(!page.has_more());
}

#[tokio::test]
async fn test_query_rejects_blank_sql_locally() {
    let (client, registry) = registry_client();

    let error = client.twins().query("   ", None, None).await.unwrap_err();
    assert!(error.status().is_none());
    assert!(registry.request_log().await.is_empty());
}
