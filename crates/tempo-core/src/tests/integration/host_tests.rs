#![cfg(test)]

use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Utc;
use tokio::test;

use crate::event::{CalendarItem, ItemEvent};
use crate::host::HostConfig;
use crate::plugin_system::capability::CapabilityType;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::manager::PluginManager;
use crate::plugin_system::status::SystemHealth;

use super::common::{BrokenSyncPlugin, MirrorPlugin};

#[test]
async fn test_full_host_lifecycle() {
    let config = HostConfig::from_toml_str(
        r#"
        host_version = "1.4.0"
        call_timeout_ms = 5000
        "#,
    )
    .unwrap();
    let manager = PluginManager::new(config);

    let mirror = Arc::new(MirrorPlugin::new("mirror"));
    manager.register_plugin(mirror.clone()).await.unwrap();
    manager
        .register_plugin(Arc::new(BrokenSyncPlugin::new("broken")))
        .await
        .unwrap();
    manager.load_plugin("mirror").await.unwrap();

    // A created and an updated item flow through to the mirror
    let item = CalendarItem::new("standup", "Daily standup", Utc::now());
    assert_eq!(
        manager.route_event(&ItemEvent::Created { item: item.clone() }).await,
        1,
        "Only the mirror advertises event hooks"
    );
    let mut renamed = item.clone();
    renamed.title = "Weekly standup".to_string();
    manager
        .route_event(&ItemEvent::Updated { item: renamed.clone() })
        .await;
    assert_eq!(mirror.items.lock().await[0].title, "Weekly standup");

    // Discovery sees the mirror as the calendar provider
    {
        let registry = manager.registry().lock().await;
        let providers = registry.plugins_by_capability(CapabilityType::Calendar);
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].id(), "mirror");
        let status = registry.capability_status(CapabilityType::Sync);
        assert_eq!(status.provider_count, 1);
    }

    // The failing plugin contributes a failed result, not an aborted batch
    let results = manager.system_sync().await;
    assert_eq!(results.len(), 2);
    assert!(results[0].success);
    assert_eq!(results[0].events_exported, 1);
    assert!(!results[1].success);

    // One of two plugins erroring during sync does not make the status
    // pass unhealthy: status derives from settings, not sync outcomes
    let status = manager.system_status().await;
    assert_eq!(status.total_plugins, 2);
    assert_eq!(status.health, SystemHealth::Healthy);

    manager
        .route_event(&ItemEvent::Deleted {
            id: "standup".to_string(),
        })
        .await;
    assert_eq!(mirror.item_count().await, 0);

    manager.destroy().await;
    assert!(mirror.destroyed.load(Ordering::SeqCst));
}

#[test]
async fn test_incompatible_plugin_is_rejected_at_the_door() {
    let manager = PluginManager::new(HostConfig::new("1.4.0"));
    let outdated = Arc::new(MirrorPlugin::new("outdated").requiring_host(">=2.0.0"));

    let err = manager.register_plugin(outdated).await.unwrap_err();
    assert!(matches!(
        err,
        PluginSystemError::IncompatibleVersion { ref required, .. } if required == ">=2.0.0"
    ));
    assert!(manager.registry().lock().await.is_empty());
}

#[test]
async fn test_strict_dependencies_with_allow_list() {
    let config = HostConfig::from_toml_str(
        r#"
        host_version = "1.4.0"
        dependency_policy = "strict"
        allowed_capabilities = ["calendar", "export", "sync"]
        "#,
    )
    .unwrap();
    let manager = PluginManager::new(config);

    // OAuth is outside the allow-list and nothing registered provides it
    let needy = Arc::new(MirrorPlugin::new("needy").requiring_capability(CapabilityType::OAuth));
    let err = manager.register_plugin(needy).await.unwrap_err();
    assert!(matches!(
        err,
        PluginSystemError::MissingCapability { ref missing, .. }
            if missing == &[CapabilityType::OAuth]
    ));
    assert!(
        manager.registry().lock().await.is_empty(),
        "Strict rejection rolls the registration back"
    );

    // An allow-listed requirement registers cleanly
    let modest = Arc::new(MirrorPlugin::new("modest").requiring_capability(CapabilityType::Sync));
    manager.register_plugin(modest).await.unwrap();
    assert_eq!(manager.registry().lock().await.len(), 1);
}

#[test]
async fn test_disabled_plugin_is_invisible_to_batches() {
    let manager = PluginManager::new(HostConfig::new("1.4.0"));
    let mirror = Arc::new(MirrorPlugin::new("mirror"));
    manager.register_plugin(mirror.clone()).await.unwrap();
    manager.disable_plugin("mirror").await.unwrap();

    let delivered = manager
        .route_event(&ItemEvent::Created {
            item: CalendarItem::new("e1", "Hidden", Utc::now()),
        })
        .await;
    assert_eq!(delivered, 0);
    assert_eq!(mirror.item_count().await, 0);
    assert!(manager.system_sync().await.is_empty());

    // Re-enabling restores delivery without re-registration
    manager.enable_plugin("mirror").await.unwrap();
    let delivered = manager
        .route_event(&ItemEvent::Created {
            item: CalendarItem::new("e2", "Visible", Utc::now()),
        })
        .await;
    assert_eq!(delivered, 1);
    assert_eq!(mirror.item_count().await, 1);
}
