//! # Tempo Core Plugin System Errors
//!
//! Defines error types specific to the Tempo plugin system.
//!
//! [`PluginSystemError`] covers registration gating (duplicates, version
//! incompatibility, missing capabilities), lifecycle failures, and the
//! per-call faults the manager isolates during event routing and sync.
//! Plugins themselves return this type from their trait methods.

use crate::plugin_system::capability::CapabilityType;
use crate::plugin_system::version::VersionError;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin already registered: '{0}'")]
    AlreadyRegistered(String),

    #[error(
        "Plugin '{plugin_id}' requires host version '{required}', but the host is {host_version}"
    )]
    IncompatibleVersion {
        plugin_id: String,
        required: String,
        host_version: String,
    },

    #[error("Plugin '{plugin_id}' requires unavailable capabilities: {missing:?}")]
    MissingCapability {
        plugin_id: String,
        missing: Vec<CapabilityType>,
    },

    #[error("Plugin not found: '{0}'")]
    PluginNotFound(String),

    #[error("Plugin initialization failed for '{plugin_id}': {source}")]
    InitializationFailed {
        plugin_id: String,
        #[source]
        source: Box<PluginSystemError>,
    },

    #[error("Plugin destroy failed for '{plugin_id}': {source}")]
    DestroyFailed {
        plugin_id: String,
        #[source]
        source: Box<PluginSystemError>,
    },

    #[error("Sync failed for plugin '{plugin_id}': {message}")]
    SyncFailed { plugin_id: String, message: String },

    #[error("Event delivery failed for plugin '{plugin_id}': {source}")]
    EventDeliveryFailed {
        plugin_id: String,
        #[source]
        source: Box<PluginSystemError>,
    },

    #[error("Call to plugin '{plugin_id}' timed out after {timeout_ms}ms during '{operation}'")]
    CallTimeout {
        plugin_id: String,
        operation: String,
        timeout_ms: u64,
    },

    #[error("Operation '{operation}' failed in plugin '{plugin_id}': {message}")]
    OperationFailed {
        plugin_id: String,
        operation: String,
        message: String,
    },

    #[error("Version parsing error: {0}")]
    VersionParsing(#[from] VersionError),
}

impl PluginSystemError {
    /// Shorthand for plugin authors reporting a failed operation.
    pub fn operation(
        plugin_id: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        PluginSystemError::OperationFailed {
            plugin_id: plugin_id.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Shorthand for plugin authors reporting a failed sync pass.
    pub fn sync(plugin_id: impl Into<String>, message: impl Into<String>) -> Self {
        PluginSystemError::SyncFailed {
            plugin_id: plugin_id.into(),
            message: message.into(),
        }
    }
}
