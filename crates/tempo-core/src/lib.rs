//! Tempo core: the plugin registry, compatibility and dispatch engine.

pub mod event;
pub mod host;
pub mod plugin_system;

// Re-export key public types/traits for easier use by the binary and plugins
pub use event::{CalendarItem, ItemEvent};
pub use host::{HostConfig, DEFAULT_HOST_VERSION};
pub use plugin_system::error::PluginSystemError;
pub use plugin_system::{
    Capability, CapabilityType, HookSet, Plugin, PluginHook, PluginManager, PluginRegistry,
    PluginSettings, SettingsUpdate, SyncResult,
};

// Integration test module declaration
#[cfg(test)]
mod tests;
