//! Status and sync-result records reported by plugins and aggregated by the
//! manager.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plugin_system::capability::CapabilityType;

/// Coarse plugin lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    Active,
    Inactive,
    Error,
    Syncing,
    Initializing,
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PluginState::Active => "active",
            PluginState::Inactive => "inactive",
            PluginState::Error => "error",
            PluginState::Syncing => "syncing",
            PluginState::Initializing => "initializing",
        };
        write!(f, "{}", label)
    }
}

/// Runtime health figures for one plugin. Only uptime is always present;
/// memory and latency are filled in by plugins that track them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginHealth {
    pub uptime_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_latency_ms: Option<u64>,
}

/// Point-in-time status of a single plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginStatus {
    pub id: String,
    pub state: PluginState,
    pub error_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<CapabilityType>,
    #[serde(default)]
    pub health: PluginHealth,
}

impl PluginStatus {
    pub fn new(id: impl Into<String>, state: PluginState) -> Self {
        Self {
            id: id.into(),
            state,
            error_count: 0,
            last_error: None,
            capabilities: Vec::new(),
            health: PluginHealth::default(),
        }
    }
}

/// Timing data attached to a sync result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPerformance {
    pub duration_ms: u64,
}

/// Outcome of one sync pass for one plugin.
///
/// A failed pass is still a result: `success` is false and `errors` carries
/// the messages. The manager synthesizes such a record when a plugin's
/// `sync` call returns an error, so a batch always yields one result per
/// participating plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResult {
    pub plugin_id: String,
    pub success: bool,
    pub events_imported: u32,
    pub events_exported: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub last_sync: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<SyncPerformance>,
}

impl SyncResult {
    /// A successful result with the given item counts, stamped now.
    pub fn success(plugin_id: impl Into<String>, imported: u32, exported: u32) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            success: true,
            events_imported: imported,
            events_exported: exported,
            errors: Vec::new(),
            last_sync: Utc::now(),
            metadata: None,
            performance: None,
        }
    }

    /// A failed result carrying one error message, stamped now.
    pub fn failure(plugin_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            success: false,
            events_imported: 0,
            events_exported: 0,
            errors: vec![message.into()],
            last_sync: Utc::now(),
            metadata: None,
            performance: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Aggregate health of the whole plugin system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    Healthy,
    Warning,
    Error,
}

impl SystemHealth {
    /// Zero errored plugins is healthy; fewer than half is a warning;
    /// half or more is an error. An empty system is healthy.
    pub fn classify(errored: usize, total: usize) -> Self {
        if errored == 0 {
            SystemHealth::Healthy
        } else if errored * 2 < total {
            SystemHealth::Warning
        } else {
            SystemHealth::Error
        }
    }
}

impl fmt::Display for SystemHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SystemHealth::Healthy => "healthy",
            SystemHealth::Warning => "warning",
            SystemHealth::Error => "error",
        };
        write!(f, "{}", label)
    }
}

/// Snapshot of every plugin's status plus derived aggregate counts.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub total_plugins: usize,
    pub active_plugins: usize,
    pub error_plugins: usize,
    pub plugins: Vec<PluginStatus>,
    pub health: SystemHealth,
    pub generated_at: DateTime<Utc>,
}

/// One provider entry inside a [`CapabilityStatus`].
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityProvider {
    pub plugin_id: String,
    pub plugin_name: String,
    pub active: bool,
}

/// Who provides a given capability type right now.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityStatus {
    #[serde(rename = "type")]
    pub kind: CapabilityType,
    pub provider_count: usize,
    pub providers: Vec<CapabilityProvider>,
}
