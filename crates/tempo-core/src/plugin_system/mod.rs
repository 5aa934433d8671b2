//! # Tempo Core Plugin System
//!
//! This module provides the infrastructure for extending Tempo through
//! statically registered plugins. It covers version-gated registration,
//! capability indexing and discovery, lifecycle orchestration, event
//! routing, and system-wide sync and health aggregation.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`capability`]**: The closed capability vocabulary
//!   ([`CapabilityType`]) plus the host policies deciding which of them a
//!   host supports.
//! - **[`compat`]**: Builds [`CompatibilityReport`]s combining version
//!   matching, capability availability and advisory warnings.
//! - **[`error`]**: Defines [`PluginSystemError`], shared by the host and
//!   by plugin implementations.
//! - **[`manager`]**: The central orchestrator ([`PluginManager`]),
//!   routing events and running sync and status batches with per-plugin
//!   fault isolation.
//! - **[`registry`]**: Maintains the plugin collection
//!   ([`PluginRegistry`]) and the capability index over it.
//! - **[`settings`]**: Plugin-owned settings and partial updates.
//! - **[`status`]**: Status, health and sync-result records.
//! - **[`traits`]**: The [`Plugin`] trait plus the hook set plugins
//!   advertise their optional callbacks through.
//! - **[`version`]**: Version parsing and the range grammar used by
//!   `required_host_version`.
pub mod capability;
pub mod compat;
pub mod error;
pub mod manager;
pub mod registry;
pub mod settings;
pub mod status;
pub mod traits;
pub mod version;

pub use capability::{Capability, CapabilityPolicy, CapabilityType, DependencyPolicy};
pub use compat::{CompatibilityReport, check_compatibility};
pub use error::PluginSystemError;
pub use manager::PluginManager;
pub use registry::{PluginRegistry, RegisteredPlugin};
pub use settings::{PluginSettings, SettingsUpdate};
pub use status::{PluginStatus, SyncResult, SystemHealth, SystemStatus};
pub use traits::{HookSet, Plugin, PluginHook};
pub use version::{VersionRange, satisfies_version};
// Test module declaration
#[cfg(test)]
mod tests;
