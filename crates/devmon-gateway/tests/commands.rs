//! Command layer tests against in-memory plugins

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use devmon_cache::CacheSettings;
use devmon_core::{
    Device, PluginError, Reading, TransactionRecord, TransactionState, WritePayload,
};
use devmon_gateway::Gateway;
use devmon_plugin::testing::{MockConnector, MockPluginClient};
use devmon_plugin::{PluginManager, PluginSettings};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;

fn device(id: &str, plugin: &str, alias: &str, sort_index: i32, tags: &[&str]) -> Device {
    serde_json::from_value(json!({
        "id": id,
        "alias": alias,
        "plugin": plugin,
        "type": "temperature",
        "info": format!("device {}", id),
        "sort_index": sort_index,
        "tags": tags,
    }))
    .unwrap()
}

fn reading(device: &str, timestamp: &str, value: f64) -> Reading {
    serde_json::from_value(json!({
        "device": device,
        "device_type": "temperature",
        "type": "temperature",
        "value": value,
        "timestamp": timestamp,
    }))
    .unwrap()
}

fn on() -> WritePayload {
    WritePayload {
        action: "on".to_string(),
        data: None,
        transaction: None,
    }
}

struct Harness {
    gateway: Gateway,
    connector: Arc<MockConnector>,
}

impl Harness {
    /// Gateway over the given plugins, all listed in the static config
    async fn new(plugins: Vec<(&str, Arc<MockPluginClient>)>) -> Self {
        let connector = Arc::new(MockConnector::new());
        let mut tcp = Vec::new();
        for (address, client) in plugins {
            connector.add(address, client);
            tcp.push(address.to_string());
        }
        let manager = PluginManager::new(
            connector.clone(),
            PluginSettings {
                tcp,
                ..Default::default()
            },
        );
        let gateway = Gateway::new(manager, &CacheSettings::default());
        gateway
            .device_cache()
            .rebuild(gateway.plugin_manager())
            .await
            .unwrap();
        Self { gateway, connector }
    }
}

/// Plugin "123" with two devices: d1 tagged A and B, d2 tagged B
fn plugin_123() -> Arc<MockPluginClient> {
    Arc::new(MockPluginClient::new("123", "vaporio/test").with_devices(vec![
        device("d1", "123", "", 2, &["default/A", "default/B"]),
        device("d2", "123", "", 1, &["default/B"]),
        device("abc", "123", "front-led", 0, &["default/led"]),
    ]))
}

fn scan_ids(devices: &[devmon_core::DeviceSummary]) -> Vec<&str> {
    devices.iter().map(|d| d.id.as_str()).collect()
}

fn groups(groups: &[&[&str]]) -> Vec<Vec<String>> {
    groups
        .iter()
        .map(|g| g.iter().map(|t| t.to_string()).collect())
        .collect()
}

// =============================================================================
// scan / tags / info
// =============================================================================

#[tokio::test]
async fn scan_ors_groups_and_ands_tags() {
    let a = Arc::new(
        MockPluginClient::new("1", "vaporio/a")
            .with_devices(vec![device("d1", "1", "", 0, &["default/A"])]),
    );
    let b = Arc::new(
        MockPluginClient::new("2", "vaporio/b")
            .with_devices(vec![device("d2", "2", "", 0, &["default/B"])]),
    );
    let h = Harness::new(vec![("p1:5001", a), ("p2:5001", b)]).await;

    let union = h
        .gateway
        .scan(None, &groups(&[&["A"], &["B"]]), Some("id"), false)
        .await
        .unwrap();
    assert_eq!(scan_ids(&union), vec!["d1", "d2"]);

    let both = h
        .gateway
        .scan(None, &groups(&[&["A", "B"]]), None, false)
        .await
        .unwrap();
    assert!(both.is_empty());
}

#[tokio::test]
async fn scan_default_sort_is_plugin_sort_index_id() {
    let h = Harness::new(vec![("p1:5001", plugin_123())]).await;

    let all = h.gateway.scan(None, &[], None, false).await.unwrap();
    assert_eq!(scan_ids(&all), vec!["abc", "d2", "d1"]);

    let by_id = h.gateway.scan(None, &[], Some("id"), false).await.unwrap();
    assert_eq!(scan_ids(&by_id), vec!["abc", "d1", "d2"]);
}

#[tokio::test]
async fn scan_with_overlapping_groups_lists_device_once() {
    let h = Harness::new(vec![("p1:5001", plugin_123())]).await;

    let devices = h
        .gateway
        .scan(None, &groups(&[&["A"], &["B"]]), Some("id"), false)
        .await
        .unwrap();
    assert_eq!(scan_ids(&devices), vec!["d1", "d2"]);
}

#[tokio::test]
async fn scan_namespace_applies_to_bare_tags() {
    let client = Arc::new(
        MockPluginClient::new("1", "vaporio/a")
            .with_devices(vec![device("d1", "1", "", 0, &["vapor/rack:1"])]),
    );
    let h = Harness::new(vec![("p1:5001", client)]).await;

    let found = h
        .gateway
        .scan(Some("vapor"), &groups(&[&["rack:1"]]), None, false)
        .await
        .unwrap();
    assert_eq!(scan_ids(&found), vec!["d1"]);

    let missed = h
        .gateway
        .scan(None, &groups(&[&["rack:1"]]), None, false)
        .await
        .unwrap();
    assert!(missed.is_empty());
}

#[tokio::test]
async fn scan_bad_sort_key_is_invalid_usage() {
    let h = Harness::new(vec![("p1:5001", plugin_123())]).await;
    let err = h
        .gateway
        .scan(None, &[], Some("plugin,colour"), false)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn scan_force_rebuilds_cache() {
    let client = plugin_123();
    let h = Harness::new(vec![("p1:5001", client.clone())]).await;
    client.set_devices(vec![device("new", "123", "", 0, &["default/A"])]);

    let stale = h.gateway.scan(None, &[], None, false).await.unwrap();
    assert_eq!(stale.len(), 3);

    let fresh = h.gateway.scan(None, &[], None, true).await.unwrap();
    assert_eq!(scan_ids(&fresh), vec!["new"]);
}

#[tokio::test]
async fn scan_force_surfaces_rebuild_error() {
    let client = plugin_123();
    let h = Harness::new(vec![("p1:5001", client.clone())]).await;
    client.fail_with(PluginError::Decode("bad devices".into()));

    let err = h.gateway.scan(None, &[], None, true).await.unwrap_err();
    assert_eq!(err.kind(), "server_error");
}

#[tokio::test]
async fn tags_filter_namespace_and_identity() {
    let client = Arc::new(
        MockPluginClient::new("1", "vaporio/a")
            .with_devices(vec![device("1", "1", "", 0, &["default/foo", "foo", "vapor/bar"])]),
    );
    let h = Harness::new(vec![("p1:5001", client)]).await;

    assert_eq!(
        h.gateway.tags(&["default".to_string()], false).await,
        vec!["default/foo", "foo"]
    );
    assert_eq!(h.gateway.tags(&[], false).await, vec!["default/foo", "foo"]);
    assert_eq!(
        h.gateway
            .tags(&["vapor".to_string(), "system".to_string()], true)
            .await,
        vec!["system/id:1", "vapor/bar"]
    );
}

#[tokio::test]
async fn info_by_id_or_alias() {
    let h = Harness::new(vec![("p1:5001", plugin_123())]).await;

    let detail = h.gateway.info("front-led").await.unwrap();
    assert_eq!(detail.summary.id, "abc");
    assert_eq!(detail.summary.plugin, "123");

    let err = h.gateway.info("missing").await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}

// =============================================================================
// read
// =============================================================================

#[tokio::test]
async fn read_by_tags_across_plugins() {
    let a = plugin_123();
    a.set_readings(vec![
        reading("d1", "2026-01-01T00:00:00Z", 20.0),
        reading("d2", "2026-01-01T00:00:00Z", 21.0),
    ]);
    let b = Arc::new(
        MockPluginClient::new("456", "vaporio/b")
            .with_devices(vec![device("e1", "456", "", 0, &["default/A"])]),
    );
    b.set_readings(vec![reading("e1", "2026-01-01T00:00:00Z", 30.0)]);
    let h = Harness::new(vec![("p1:5001", a), ("p2:5001", b)]).await;

    let readings = h
        .gateway
        .read(None, &groups(&[&["A"]]), None)
        .await
        .unwrap();
    let devices: Vec<&str> = readings.iter().map(|r| r.device.as_str()).collect();
    assert_eq!(devices, vec!["d1", "e1"]);

    let only_b = h
        .gateway
        .read(None, &[], Some("456"))
        .await
        .unwrap();
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].device, "e1");
}

#[tokio::test]
async fn read_deduplicates_overlapping_groups() {
    let client = plugin_123();
    client.set_readings(vec![reading("d1", "2026-01-01T00:00:00Z", 20.0)]);
    let h = Harness::new(vec![("p1:5001", client)]).await;

    let readings = h
        .gateway
        .read(None, &groups(&[&["A"], &["B"]]), None)
        .await
        .unwrap();
    assert_eq!(readings.len(), 1);
}

#[tokio::test]
async fn read_keeps_readings_that_differ_only_in_context() {
    let phase = |p: &str, value: f64| Reading {
        context: BTreeMap::from([("phase".to_string(), p.to_string())]),
        ..reading("d1", "2024-01-01T00:00:00Z", value)
    };
    let client = plugin_123();
    client.set_readings(vec![phase("a", 1.5), phase("b", 2.5)]);
    let h = Harness::new(vec![("p1:5001", client)]).await;

    let single = h
        .gateway
        .read(None, &groups(&[&["A"]]), None)
        .await
        .unwrap();
    assert_eq!(single, vec![phase("a", 1.5), phase("b", 2.5)]);

    // Overlapping groups still yield each distinct reading once
    let overlapping = h
        .gateway
        .read(None, &groups(&[&["A"], &["B"]]), None)
        .await
        .unwrap();
    assert_eq!(overlapping, vec![phase("a", 1.5), phase("b", 2.5)]);
}

#[tokio::test]
async fn read_unknown_plugin_is_not_found() {
    let h = Harness::new(vec![("p1:5001", plugin_123())]).await;
    let err = h.gateway.read(None, &[], Some("nope")).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn read_fails_on_any_plugin_error() {
    let a = plugin_123();
    let b = Arc::new(MockPluginClient::new("456", "vaporio/b"));
    let h = Harness::new(vec![("p1:5001", a), ("p2:5001", b.clone())]).await;

    b.fail_with(PluginError::Transport("connection reset".into()));
    let err = h.gateway.read(None, &[], None).await.unwrap_err();
    assert_eq!(err.kind(), "server_error");
    assert!(err.context().unwrap().contains("connection reset"));
    assert!(!h.gateway.plugin_manager().get("456").unwrap().is_active());

    // The inactive plugin is skipped by the next read
    let readings = h.gateway.read(None, &[], None).await.unwrap();
    assert!(readings.is_empty());
}

#[tokio::test]
async fn read_device_goes_to_owner() {
    let client = plugin_123();
    client.set_readings(vec![
        reading("abc", "2026-01-01T00:00:00Z", 1.0),
        reading("d1", "2026-01-01T00:00:00Z", 2.0),
    ]);
    let h = Harness::new(vec![("p1:5001", client)]).await;

    let readings = h.gateway.read_device("front-led").await.unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].device, "abc");

    let err = h.gateway.read_device("missing").await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn read_cache_drains_plugins_in_order() {
    let a = Arc::new(MockPluginClient::new("1", "vaporio/a"));
    a.set_readings(vec![
        reading("a1", "2026-01-01T00:00:00Z", 1.0),
        reading("a1", "2026-01-01T00:01:00Z", 2.0),
        reading("a1", "2026-01-01T00:02:00Z", 3.0),
    ]);
    let b = Arc::new(MockPluginClient::new("2", "vaporio/b"));
    b.set_readings(vec![reading("b1", "2026-01-01T00:01:30Z", 4.0)]);
    let h = Harness::new(vec![("p1:5001", a), ("p2:5001", b)]).await;

    let readings: Vec<Reading> = h
        .gateway
        .read_cache(Some("2026-01-01T00:01:00Z".to_string()), None)
        .map(|r| r.unwrap())
        .collect()
        .await;
    let values: Vec<f64> = readings
        .iter()
        .map(|r| r.value.as_f64().unwrap())
        .collect();
    assert_eq!(values, vec![2.0, 3.0, 4.0]);
}

#[tokio::test]
async fn read_cache_stops_at_first_error() {
    let a = Arc::new(MockPluginClient::new("1", "vaporio/a"));
    a.set_readings(vec![reading("a1", "2026-01-01T00:00:00Z", 1.0)]);
    let b = Arc::new(MockPluginClient::new("2", "vaporio/b"));
    b.set_readings(vec![reading("b1", "2026-01-01T00:00:00Z", 2.0)]);
    let h = Harness::new(vec![("p1:5001", a.clone()), ("p2:5001", b)]).await;

    a.fail_with(PluginError::Unavailable("shutting down".into()));
    let results: Vec<_> = h.gateway.read_cache(None, None).collect().await;
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

// =============================================================================
// write / transaction
// =============================================================================

#[tokio::test]
async fn write_async_records_transaction() {
    let h = Harness::new(vec![("p1:5001", plugin_123())]).await;

    let txns = h.gateway.write_async("abc", &[on()]).await.unwrap();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].device, "abc");

    let status = h.gateway.transaction(&txns[0].id).await.unwrap();
    assert_eq!(status.device, "abc");
    assert_eq!(status.status, TransactionState::Pending);
    assert_eq!(h.gateway.transactions(), vec![txns[0].id.clone()]);
}

#[tokio::test]
async fn write_async_via_alias_records_device_id() {
    let client = plugin_123();
    let h = Harness::new(vec![("p1:5001", client.clone())]).await;

    let txns = h.gateway.write_async("front-led", &[on()]).await.unwrap();
    client.set_transaction_state(&txns[0].id, TransactionState::Done);

    let status = h.gateway.transaction(&txns[0].id).await.unwrap();
    assert_eq!(status.device, "abc");
    assert_eq!(status.status, TransactionState::Done);
}

#[tokio::test]
async fn write_sync_returns_final_statuses() {
    let h = Harness::new(vec![("p1:5001", plugin_123())]).await;

    let statuses = h.gateway.write_sync("d1", &[on(), on()]).await.unwrap();
    assert_eq!(statuses.len(), 2);
    assert!(statuses
        .iter()
        .all(|s| s.device == "d1" && s.status == TransactionState::Done));
    assert_eq!(h.gateway.transactions().len(), 2);
}

#[tokio::test]
async fn write_errors() {
    let client = plugin_123();
    let h = Harness::new(vec![("p1:5001", client.clone())]).await;

    let err = h.gateway.write_async("missing", &[on()]).await.unwrap_err();
    assert_eq!(err.status_code(), 404);

    let mut no_action = on();
    no_action.action.clear();
    let err = h.gateway.write_async("abc", &[no_action]).await.unwrap_err();
    assert_eq!(err.status_code(), 400);

    client.fail_with(PluginError::Timeout("write".into()));
    let err = h.gateway.write_sync("abc", &[on()]).await.unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert!(h.gateway.transactions().is_empty());
}

#[tokio::test]
async fn transaction_lookup_failures() {
    let h = Harness::new(vec![("p1:5001", plugin_123())]).await;

    let err = h.gateway.transaction("unknown").await.unwrap_err();
    assert_eq!(err.status_code(), 404);

    h.gateway
        .transaction_cache()
        .add(TransactionRecord {
            transaction: "corrupt".to_string(),
            plugin: String::new(),
            device: "abc".to_string(),
        })
        .await;
    let err = h.gateway.transaction("corrupt").await.unwrap_err();
    assert_eq!(err.status_code(), 500);

    h.gateway
        .transaction_cache()
        .add(TransactionRecord {
            transaction: "orphan".to_string(),
            plugin: "gone".to_string(),
            device: "abc".to_string(),
        })
        .await;
    let err = h.gateway.transaction("orphan").await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}

// =============================================================================
// plugins
// =============================================================================

#[tokio::test]
async fn plugins_listed_by_id() {
    let h = Harness::new(vec![
        ("p2:5001", Arc::new(MockPluginClient::new("2", "vaporio/b"))),
        ("p1:5001", Arc::new(MockPluginClient::new("1", "vaporio/a"))),
    ])
    .await;

    let plugins = h.gateway.plugins(false).await;
    let ids: Vec<&str> = plugins.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert!(plugins.iter().all(|p| p.active));
}

#[tokio::test]
async fn plugin_detail_reports_health() {
    let client = plugin_123();
    let h = Harness::new(vec![("p1:5001", client.clone())]).await;

    let detail = h.gateway.plugin("123").await.unwrap();
    assert_eq!(detail.network.address, "p1:5001");
    assert!(detail.active);
    assert!(detail.health.unwrap().is_ok());

    client.fail_with(PluginError::Transport("refused".into()));
    let detail = h.gateway.plugin("123").await.unwrap();
    assert!(!detail.active);
    assert!(detail.health.is_none());

    let err = h.gateway.plugin("missing").await.unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn plugin_health_summary() {
    let good = Arc::new(MockPluginClient::new("1", "vaporio/a"));
    let bad = Arc::new(MockPluginClient::new("2", "vaporio/b"));
    let h = Harness::new(vec![("p1:5001", good), ("p2:5001", bad.clone())]).await;

    let summary = h.gateway.plugin_health().await;
    assert_eq!(summary.status, "healthy");
    assert_eq!(summary.active, 2);

    bad.fail_with(PluginError::Timeout("health".into()));
    let summary = h.gateway.plugin_health().await;
    assert_eq!(summary.status, "unhealthy");
    assert_eq!(summary.healthy, vec!["1"]);
    assert_eq!(summary.unhealthy, vec!["2"]);
    assert_eq!((summary.active, summary.inactive), (1, 1));
}

#[tokio::test]
async fn plugins_refresh_picks_up_recovered_plugin() {
    let client = Arc::new(MockPluginClient::new("1", "vaporio/a"));
    let connector = Arc::new(MockConnector::new());
    connector.add("p1:5001", client);
    connector.set_unreachable("p1:5001", true);
    let manager = PluginManager::new(
        connector.clone(),
        PluginSettings {
            tcp: vec!["p1:5001".to_string()],
            ..Default::default()
        },
    );
    let gateway = Gateway::new(manager, &CacheSettings::default());
    let h = Harness { gateway, connector };

    assert!(h.gateway.plugins(false).await.is_empty());

    h.connector.set_unreachable("p1:5001", false);
    assert_eq!(h.gateway.plugins(true).await.len(), 1);
}

// =============================================================================
// background tasks
// =============================================================================

#[tokio::test(start_paused = true)]
async fn background_tasks_warm_cache_immediately() {
    let client = plugin_123();
    let connector = Arc::new(MockConnector::new());
    connector.add("p1:5001", client.clone());
    let manager = PluginManager::new(
        connector,
        PluginSettings {
            tcp: vec!["p1:5001".to_string()],
            ..Default::default()
        },
    );
    let gateway = Gateway::new(manager, &CacheSettings::default());

    let tasks = devmon_gateway::tasks::spawn(gateway.clone());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(gateway.device_cache().lookup_device("abc").await.is_some());

    // Next rebuild picks up changes
    client.set_devices(vec![device("zzz", "123", "", 0, &[])]);
    tokio::time::sleep(Duration::from_secs(181)).await;
    assert!(gateway.device_cache().lookup_device("zzz").await.is_some());
    assert!(gateway.device_cache().lookup_device("abc").await.is_none());

    tasks.abort();
}

#[tokio::test(start_paused = true)]
async fn background_rebuild_recovers_after_failed_iteration() {
    let client = plugin_123();
    let connector = Arc::new(MockConnector::new());
    connector.add("p1:5001", client.clone());
    let manager = PluginManager::new(
        connector,
        PluginSettings {
            tcp: vec!["p1:5001".to_string()],
            ..Default::default()
        },
    );
    let gateway = Gateway::new(manager, &CacheSettings::default());
    gateway.plugin_manager().refresh().await;
    assert!(gateway.plugin_manager().has_plugins());

    client.fail_with(PluginError::Decode("garbled device list".into()));
    let tasks = devmon_gateway::tasks::spawn(gateway.clone());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(client.device_calls() >= 1);
    assert!(gateway.device_cache().lookup_device("abc").await.is_none());
    assert!(!tasks.rebuild.is_finished());

    client.clear_failure();
    tokio::time::sleep(Duration::from_secs(181)).await;
    assert!(gateway.device_cache().lookup_device("abc").await.is_some());
    assert!(!tasks.rebuild.is_finished());
    assert!(!tasks.refresh.is_finished());

    tasks.abort();
}
