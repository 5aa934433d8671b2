use std::fmt;

use async_trait::async_trait;

use crate::event::CalendarItem;
use crate::plugin_system::capability::{Capability, CapabilityType};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::settings::{PluginSettings, SettingsUpdate};
use crate::plugin_system::status::{PluginState, PluginStatus, SyncResult};

/// Optional hooks a plugin can advertise
///
/// The manager only invokes a hook the plugin lists in [`Plugin::hooks`].
/// Overriding a trait method without advertising the matching hook leaves
/// the override unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginHook {
    /// `on_event_created` is implemented
    EventCreated,
    /// `on_event_updated` is implemented
    EventUpdated,
    /// `on_event_deleted` is implemented
    EventDeleted,
    /// `sync` is implemented
    Sync,
    /// `status` is implemented
    Status,
}

impl PluginHook {
    /// Every hook, in declaration order
    pub const ALL: [PluginHook; 5] = [
        PluginHook::EventCreated,
        PluginHook::EventUpdated,
        PluginHook::EventDeleted,
        PluginHook::Sync,
        PluginHook::Status,
    ];

    const fn bit(self) -> u8 {
        match self {
            PluginHook::EventCreated => 1 << 0,
            PluginHook::EventUpdated => 1 << 1,
            PluginHook::EventDeleted => 1 << 2,
            PluginHook::Sync => 1 << 3,
            PluginHook::Status => 1 << 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PluginHook::EventCreated => "event_created",
            PluginHook::EventUpdated => "event_updated",
            PluginHook::EventDeleted => "event_deleted",
            PluginHook::Sync => "sync",
            PluginHook::Status => "status",
        }
    }
}

impl fmt::Display for PluginHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Bit set of [`PluginHook`] values, checked in O(1) during dispatch
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct HookSet(u8);

impl HookSet {
    pub const fn empty() -> Self {
        HookSet(0)
    }

    pub const fn all() -> Self {
        HookSet(
            PluginHook::EventCreated.bit()
                | PluginHook::EventUpdated.bit()
                | PluginHook::EventDeleted.bit()
                | PluginHook::Sync.bit()
                | PluginHook::Status.bit(),
        )
    }

    /// Const-friendly builder: `HookSet::empty().with(PluginHook::Sync)`
    pub const fn with(self, hook: PluginHook) -> Self {
        HookSet(self.0 | hook.bit())
    }

    pub fn insert(&mut self, hook: PluginHook) {
        self.0 |= hook.bit();
    }

    pub const fn contains(self, hook: PluginHook) -> bool {
        self.0 & hook.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = PluginHook> {
        PluginHook::ALL
            .into_iter()
            .filter(move |hook| self.contains(*hook))
    }
}

impl FromIterator<PluginHook> for HookSet {
    fn from_iter<I: IntoIterator<Item = PluginHook>>(iter: I) -> Self {
        let mut set = HookSet::empty();
        for hook in iter {
            set.insert(hook);
        }
        set
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Core trait that all plugins must implement
///
/// Identity methods are infallible and must stay stable for the lifetime of
/// the plugin: the registry snapshots capabilities and hooks at registration
/// time. Everything that can touch I/O is async and returns a `Result`; the
/// manager treats any error as that plugin's failure alone.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique identifier, used as the registry key
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// The version of the plugin
    fn version(&self) -> &str;

    /// Short description for listings
    fn description(&self) -> &str {
        ""
    }

    fn author(&self) -> &str {
        ""
    }

    /// Version range the host must satisfy, e.g. `^1.0.0` or `>=0.2.0`
    fn required_host_version(&self) -> &str;

    /// Capability types this plugin needs the host to make available
    fn required_capabilities(&self) -> Vec<CapabilityType> {
        Vec::new()
    }

    /// Capabilities this plugin provides
    fn capabilities(&self) -> Vec<Capability>;

    /// Optional hooks this plugin implements
    fn hooks(&self) -> HookSet {
        HookSet::empty()
    }

    /// Initialize the plugin
    async fn initialize(&self) -> Result<(), PluginSystemError>;

    /// Tear the plugin down, releasing whatever it holds
    async fn destroy(&self) -> Result<(), PluginSystemError>;

    /// Current settings, owned by the plugin
    async fn get_settings(&self) -> Result<PluginSettings, PluginSystemError>;

    /// Apply a partial settings update
    async fn update_settings(&self, update: SettingsUpdate) -> Result<(), PluginSystemError>;

    /// Called when a calendar item is created.
    /// Only invoked when [`PluginHook::EventCreated`] is advertised.
    async fn on_event_created(&self, _item: &CalendarItem) -> Result<(), PluginSystemError> {
        Ok(())
    }

    /// Called when a calendar item is updated.
    /// Only invoked when [`PluginHook::EventUpdated`] is advertised.
    async fn on_event_updated(&self, _item: &CalendarItem) -> Result<(), PluginSystemError> {
        Ok(())
    }

    /// Called when a calendar item is deleted.
    /// Only invoked when [`PluginHook::EventDeleted`] is advertised.
    async fn on_event_deleted(&self, _item_id: &str) -> Result<(), PluginSystemError> {
        Ok(())
    }

    /// Run one sync pass against the plugin's backing source.
    /// Only invoked when [`PluginHook::Sync`] is advertised.
    async fn sync(&self) -> Result<SyncResult, PluginSystemError> {
        Ok(SyncResult::success(self.id(), 0, 0))
    }

    /// Self-reported status.
    /// Only consulted when [`PluginHook::Status`] is advertised; otherwise
    /// the manager derives a status from the plugin's settings.
    async fn status(&self) -> Result<PluginStatus, PluginSystemError> {
        let mut status = PluginStatus::new(self.id(), PluginState::Active);
        status.capabilities = self.capabilities().iter().map(|c| c.kind).collect();
        Ok(status)
    }
}
