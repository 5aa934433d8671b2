//! Capability declarations and the host-side policies that gate them.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of capability categories a plugin may declare or require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityType {
    Import,
    Export,
    Sync,
    OAuth,
    Webhook,
    Api,
    Calendar,
    Notes,
    Music,
    Automation,
    Custom,
}

impl CapabilityType {
    /// Every known capability type, in declaration order.
    pub const ALL: [CapabilityType; 11] = [
        CapabilityType::Import,
        CapabilityType::Export,
        CapabilityType::Sync,
        CapabilityType::OAuth,
        CapabilityType::Webhook,
        CapabilityType::Api,
        CapabilityType::Calendar,
        CapabilityType::Notes,
        CapabilityType::Music,
        CapabilityType::Automation,
        CapabilityType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityType::Import => "import",
            CapabilityType::Export => "export",
            CapabilityType::Sync => "sync",
            CapabilityType::OAuth => "oauth",
            CapabilityType::Webhook => "webhook",
            CapabilityType::Api => "api",
            CapabilityType::Calendar => "calendar",
            CapabilityType::Notes => "notes",
            CapabilityType::Music => "music",
            CapabilityType::Automation => "automation",
            CapabilityType::Custom => "custom",
        }
    }
}

impl fmt::Display for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error for capability strings outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown capability type: '{0}'")]
pub struct UnknownCapability(pub String);

impl FromStr for CapabilityType {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CapabilityType::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

/// A capability a plugin offers, with a human-readable description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    #[serde(rename = "type")]
    pub kind: CapabilityType,
    pub description: String,
    /// Whether the capability exposes user-tunable settings.
    pub configurable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Capability {
    pub fn new(kind: CapabilityType, description: impl Into<String>, configurable: bool) -> Self {
        Self {
            kind,
            description: description.into(),
            configurable,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Host policy deciding which capability types it supports.
///
/// The registry consults this when a plugin lists required capabilities.
/// A type the policy rejects may still be covered by another registered
/// plugin providing it.
pub trait CapabilityPolicy: Send + Sync {
    fn accepts(&self, kind: CapabilityType) -> bool;
}

/// The default policy: every capability type is considered supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllCapabilities;

impl CapabilityPolicy for AcceptAllCapabilities {
    fn accepts(&self, _kind: CapabilityType) -> bool {
        true
    }
}

/// Policy accepting only an explicit set of capability types.
#[derive(Debug, Clone, Default)]
pub struct CapabilityAllowList {
    allowed: HashSet<CapabilityType>,
}

impl CapabilityAllowList {
    pub fn new<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = CapabilityType>,
    {
        Self {
            allowed: kinds.into_iter().collect(),
        }
    }
}

impl CapabilityPolicy for CapabilityAllowList {
    fn accepts(&self, kind: CapabilityType) -> bool {
        self.allowed.contains(&kind)
    }
}

/// How the registry reacts when a plugin requires a capability that is
/// neither accepted by the policy nor provided by any registered plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyPolicy {
    /// Log a warning and keep the plugin registered.
    #[default]
    Permissive,
    /// Roll the registration back and fail.
    Strict,
}
