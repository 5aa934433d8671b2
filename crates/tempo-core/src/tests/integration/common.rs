#![cfg(test)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::event::CalendarItem;
use crate::plugin_system::capability::{Capability, CapabilityType};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::settings::{PluginSettings, SettingsUpdate};
use crate::plugin_system::status::SyncResult;
use crate::plugin_system::traits::{HookSet, Plugin, PluginHook};

// ===== MOCK PLUGINS =====

/// A plugin maintaining a mirror of the host's calendar items, the way a
/// real export integration would.
pub struct MirrorPlugin {
    id: String,
    required_host_version: String,
    capabilities: Vec<Capability>,
    required: Vec<CapabilityType>,
    pub settings: Mutex<PluginSettings>,
    pub items: Mutex<Vec<CalendarItem>>,
    pub destroyed: AtomicBool,
}

impl MirrorPlugin {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            required_host_version: ">=1.0.0".to_string(),
            capabilities: vec![
                Capability::new(CapabilityType::Calendar, "Mirrors calendar items", false),
                Capability::new(CapabilityType::Export, "Exports items downstream", true),
            ],
            required: Vec::new(),
            settings: Mutex::new(PluginSettings::default()),
            items: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn requiring_host(mut self, range: &str) -> Self {
        self.required_host_version = range.to_string();
        self
    }

    pub fn requiring_capability(mut self, kind: CapabilityType) -> Self {
        self.required.push(kind);
        self
    }

    pub async fn item_count(&self) -> usize {
        self.items.lock().await.len()
    }
}

#[async_trait]
impl Plugin for MirrorPlugin {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.id
    }
    fn version(&self) -> &str {
        "1.2.0"
    }
    fn required_host_version(&self) -> &str {
        &self.required_host_version
    }
    fn required_capabilities(&self) -> Vec<CapabilityType> {
        self.required.clone()
    }
    fn capabilities(&self) -> Vec<Capability> {
        self.capabilities.clone()
    }
    fn hooks(&self) -> HookSet {
        HookSet::empty()
            .with(PluginHook::EventCreated)
            .with(PluginHook::EventUpdated)
            .with(PluginHook::EventDeleted)
            .with(PluginHook::Sync)
    }

    async fn initialize(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }

    async fn destroy(&self) -> Result<(), PluginSystemError> {
        self.destroyed.store(true, Ordering::SeqCst);
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
        self.items.lock().await.push(item.clone());
        Ok(())
    }

    async fn on_event_updated(&self, item: &CalendarItem) -> Result<(), PluginSystemError> {
        let mut items = self.items.lock().await;
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(())
            }
            None => Err(PluginSystemError::operation(
                &self.id,
                "on_event_updated",
                format!("Unknown item '{}'", item.id),
            )),
        }
    }

    async fn on_event_deleted(&self, item_id: &str) -> Result<(), PluginSystemError> {
        self.items.lock().await.retain(|existing| existing.id != item_id);
        Ok(())
    }

    async fn sync(&self) -> Result<SyncResult, PluginSystemError> {
        let exported = self.items.lock().await.len() as u32;
        Ok(SyncResult::success(&self.id, 0, exported))
    }
}

/// A plugin whose sync always fails. Used to exercise fault isolation in
/// whole-system passes.
pub struct BrokenSyncPlugin {
    id: String,
    settings: Mutex<PluginSettings>,
}

impl BrokenSyncPlugin {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            settings: Mutex::new(PluginSettings::default()),
        }
    }
}

#[async_trait]
impl Plugin for BrokenSyncPlugin {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.id
    }
    fn version(&self) -> &str {
        "0.3.0"
    }
    fn required_host_version(&self) -> &str {
        ">=1.0.0"
    }
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new(
            CapabilityType::Sync,
            "Always fails to sync",
            false,
        )]
    }
    fn hooks(&self) -> HookSet {
        HookSet::empty().with(PluginHook::Sync)
    }

    async fn initialize(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }

    async fn destroy(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }

    async fn get_settings(&self) -> Result<PluginSettings, PluginSystemError> {
        Ok(self.settings.lock().await.clone())
    }

    async fn update_settings(&self, update: SettingsUpdate) -> Result<(), PluginSystemError> {
        self.settings.lock().await.apply(update);
        Ok(())
    }

    async fn sync(&self) -> Result<SyncResult, PluginSystemError> {
        Err(PluginSystemError::sync(&self.id, "Upstream is unreachable"))
    }
}

pub fn arc_plugin<P: Plugin + 'static>(plugin: P) -> Arc<dyn Plugin> {
    Arc::new(plugin)
}
