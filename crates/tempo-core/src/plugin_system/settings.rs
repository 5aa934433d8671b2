//! Plugin-owned settings and the partial updates applied to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Settings owned and persisted by the plugin itself. The host never stores
/// these; it reads them through `Plugin::get_settings` and writes them back
/// through `Plugin::update_settings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSettings {
    pub enabled: bool,
    pub auto_sync: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    /// External platform the plugin talks to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Free-form plugin-specific settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<serde_json::Value>,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_sync: false,
            sync_interval_minutes: None,
            credentials: None,
            platform: None,
            custom: None,
        }
    }
}

impl PluginSettings {
    /// Applies a partial update in place. Fields the update leaves as `None`
    /// keep their current value; this cannot clear an optional field back to
    /// `None`.
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(auto_sync) = update.auto_sync {
            self.auto_sync = auto_sync;
        }
        if let Some(interval) = update.sync_interval_minutes {
            self.sync_interval_minutes = Some(interval);
        }
        if let Some(credentials) = update.credentials {
            self.credentials = Some(credentials);
        }
        if let Some(platform) = update.platform {
            self.platform = Some(platform);
        }
        if let Some(custom) = update.custom {
            self.custom = Some(custom);
        }
    }
}

/// OAuth-style credentials stored inside plugin settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A partial settings change. Every field is optional; only the ones set
/// are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_sync: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<serde_json::Value>,
}

impl SettingsUpdate {
    /// Update touching only the enabled flag.
    pub fn enabled(value: bool) -> Self {
        Self {
            enabled: Some(value),
            ..Self::default()
        }
    }

    /// Update touching only the auto-sync flag.
    pub fn auto_sync(value: bool) -> Self {
        Self {
            auto_sync: Some(value),
            ..Self::default()
        }
    }
}
