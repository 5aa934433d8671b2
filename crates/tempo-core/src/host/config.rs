//! Host configuration: version, policies and the manager's timing knobs.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::plugin_system::capability::{
    AcceptAllCapabilities, CapabilityAllowList, CapabilityPolicy, CapabilityType, DependencyPolicy,
};

/// Version advertised to plugins when a config does not override it.
pub const DEFAULT_HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Host configuration, loadable from TOML.
///
/// Every field has a default, so an empty config is valid. Absent timing
/// knobs mean the feature is off: no auto-sync task, no per-call timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Version plugins check their `required_host_version` against.
    pub host_version: String,
    /// Period of the recurring system sync, in seconds. Zero disables it.
    pub auto_sync_interval_secs: Option<u64>,
    /// Upper bound on any single plugin call, in milliseconds.
    pub call_timeout_ms: Option<u64>,
    pub dependency_policy: DependencyPolicy,
    /// Capability types the host supports. Absent means all of them.
    pub allowed_capabilities: Option<Vec<CapabilityType>>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            host_version: DEFAULT_HOST_VERSION.to_string(),
            auto_sync_interval_secs: None,
            call_timeout_ms: None,
            dependency_policy: DependencyPolicy::Permissive,
            allowed_capabilities: None,
        }
    }
}

impl HostConfig {
    /// Default config with an explicit host version.
    pub fn new(host_version: impl Into<String>) -> Self {
        Self {
            host_version: host_version.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Policy derived from `allowed_capabilities`: an allow-list when set,
    /// accept-everything otherwise.
    pub fn capability_policy(&self) -> Arc<dyn CapabilityPolicy> {
        match &self.allowed_capabilities {
            Some(kinds) => Arc::new(CapabilityAllowList::new(kinds.iter().copied())),
            None => Arc::new(AcceptAllCapabilities),
        }
    }

    /// The recurring sync period. A configured zero counts as disabled,
    /// so this never yields a zero duration.
    pub fn auto_sync_interval(&self) -> Option<Duration> {
        self.auto_sync_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}
