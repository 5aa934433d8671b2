use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, info};
use serde_json::json;
use tokio::sync::Mutex;

use tempo_core::event::CalendarItem;
use tempo_core::plugin_system::capability::{Capability, CapabilityType};
use tempo_core::plugin_system::error::PluginSystemError;
use tempo_core::plugin_system::settings::{PluginSettings, SettingsUpdate};
use tempo_core::plugin_system::status::{PluginState, PluginStatus, SyncResult};
use tempo_core::plugin_system::traits::{HookSet, Plugin, PluginHook};

pub const PLUGIN_ID: &str = "local-calendar";

/// Bundled plugin holding an in-memory mirror of the host's calendar.
///
/// Every created, updated and deleted item event is applied to the mirror,
/// and a sync pass reports how many items it currently holds. The mirror is
/// the built-in consumer of the host's event routing; it has no external
/// backend.
pub struct LocalCalendarPlugin {
    settings: Mutex<PluginSettings>,
    items: Mutex<HashMap<String, CalendarItem>>,
}

impl LocalCalendarPlugin {
    pub fn new() -> Self {
        Self {
            settings: Mutex::new(PluginSettings::default()),
            items: Mutex::new(HashMap::new()),
        }
    }

    /// Number of items currently mirrored.
    pub async fn item_count(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Mirrored items, ordered by start time.
    pub async fn items(&self) -> Vec<CalendarItem> {
        let mut items: Vec<CalendarItem> = self.items.lock().await.values().cloned().collect();
        items.sort_by_key(|item| item.start);
        items
    }
}

impl Default for LocalCalendarPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for LocalCalendarPlugin {
    fn id(&self) -> &str {
        PLUGIN_ID
    }

    fn name(&self) -> &str {
        "Local Calendar"
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn description(&self) -> &str {
        "Keeps a local mirror of calendar items"
    }

    fn author(&self) -> &str {
        "Tempo Developers"
    }

    fn required_host_version(&self) -> &str {
        "^0.1.0"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::new(
                CapabilityType::Calendar,
                "Stores calendar items on the host",
                false,
            ),
            Capability::new(
                CapabilityType::Export,
                "Serves the mirrored items to other consumers",
                true,
            ),
        ]
    }

    fn hooks(&self) -> HookSet {
        HookSet::empty()
            .with(PluginHook::EventCreated)
            .with(PluginHook::EventUpdated)
            .with(PluginHook::EventDeleted)
            .with(PluginHook::Sync)
            .with(PluginHook::Status)
    }

    async fn initialize(&self) -> Result<(), PluginSystemError> {
        info!("Local calendar plugin initialized");
        Ok(())
    }

    async fn destroy(&self) -> Result<(), PluginSystemError> {
        let mut items = self.items.lock().await;
        debug!("Local calendar dropping {} mirrored item(s)", items.len());
        items.clear();
        Ok(())
    }

    async fn get_settings(&self) -> Result<PluginSettings, PluginSystemError> {
        Ok(self.settings.lock().await.clone())
    }

    async fn update_settings(&self, update: SettingsUpdate) -> Result<(), PluginSystemError> {
        self.settings.lock().await.apply(update);
        Ok(())
    }

    async fn on_event_created(&self, item: &CalendarItem) -> Result<(), PluginSystemError> {
        self.items
            .lock()
            .await
            .insert(item.id.clone(), item.clone());
        debug!("Local calendar stored item '{}'", item.id);
        Ok(())
    }

    async fn on_event_updated(&self, item: &CalendarItem) -> Result<(), PluginSystemError> {
        // An update for an unseen item is treated as an insert; the mirror
        // may have been registered after the item was created.
        let previous = self
            .items
            .lock()
            .await
            .insert(item.id.clone(), item.clone());
        if previous.is_none() {
            debug!("Local calendar adopted unknown item '{}' on update", item.id);
        }
        Ok(())
    }

    async fn on_event_deleted(&self, item_id: &str) -> Result<(), PluginSystemError> {
        self.items.lock().await.remove(item_id);
        debug!("Local calendar removed item '{}'", item_id);
        Ok(())
    }

    async fn sync(&self) -> Result<SyncResult, PluginSystemError> {
        let stored = self.items.lock().await.len() as u32;
        Ok(SyncResult::success(PLUGIN_ID, 0, stored)
            .with_metadata(json!({ "stored_items": stored })))
    }

    async fn status(&self) -> Result<PluginStatus, PluginSystemError> {
        let settings = self.settings.lock().await;
        let state = if settings.enabled {
            PluginState::Active
        } else {
            PluginState::Inactive
        };
        let mut status = PluginStatus::new(PLUGIN_ID, state);
        status.capabilities = self.capabilities().iter().map(|c| c.kind).collect();
        Ok(status)
    }
}
