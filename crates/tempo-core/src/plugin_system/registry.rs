//! # Tempo Core Plugin Registry
//!
//! Owns every registered plugin and the capability index over them.
//!
//! Registration is gated: a plugin whose required host version does not
//! match the configured host version is rejected before any state changes.
//! The id map, the registration-order list and the capability index are
//! updated together, so lookups never observe a half-registered plugin.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, warn};

use crate::plugin_system::capability::{CapabilityPolicy, CapabilityType, DependencyPolicy};
use crate::plugin_system::compat::{CompatibilityReport, check_compatibility};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::status::{CapabilityProvider, CapabilityStatus};
use crate::plugin_system::traits::{HookSet, Plugin};

/// Registry entry for one plugin: the shared handle plus the capability and
/// hook sets snapshotted at registration time.
#[derive(Clone)]
pub struct RegisteredPlugin {
    plugin: Arc<dyn Plugin>,
    hooks: HookSet,
    declared: Vec<CapabilityType>,
}

impl RegisteredPlugin {
    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    pub fn hooks(&self) -> HookSet {
        self.hooks
    }

    /// Capability types the plugin declared when it was registered.
    pub fn declared_capabilities(&self) -> &[CapabilityType] {
        &self.declared
    }
}

/// Registry of all registered plugins
pub struct PluginRegistry {
    records: HashMap<String, RegisteredPlugin>,
    /// Registration order; batch passes iterate plugins in this order.
    order: Vec<String>,
    capability_index: HashMap<CapabilityType, HashSet<String>>,
    host_version: String,
    capability_policy: Arc<dyn CapabilityPolicy>,
    dependency_policy: DependencyPolicy,
}

impl PluginRegistry {
    pub fn new(
        host_version: impl Into<String>,
        capability_policy: Arc<dyn CapabilityPolicy>,
        dependency_policy: DependencyPolicy,
    ) -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
            capability_index: HashMap::new(),
            host_version: host_version.into(),
            capability_policy,
            dependency_policy,
        }
    }

    /// Host version compatibility is checked against.
    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    /// Changes the host version. Already-registered plugins are left alone;
    /// only future checks see the new value.
    pub fn set_host_version(&mut self, version: impl Into<String>) {
        self.host_version = version.into();
    }

    /// Registers a plugin.
    ///
    /// Rejects duplicates and version-incompatible plugins before touching
    /// any state. After the plugin is stored and indexed, its required
    /// capabilities are checked for availability: under the permissive
    /// dependency policy an unavailable requirement only logs a warning,
    /// under the strict policy the registration is rolled back and fails.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), PluginSystemError> {
        let id = plugin.id().to_string();
        if self.records.contains_key(&id) {
            return Err(PluginSystemError::AlreadyRegistered(id));
        }

        let report = check_compatibility(
            plugin.as_ref(),
            &self.host_version,
            self.capability_policy.as_ref(),
        );
        for warning in &report.warnings {
            warn!("Plugin '{}': {}", id, warning);
        }
        if !report.compatible {
            return Err(PluginSystemError::IncompatibleVersion {
                plugin_id: id,
                required: report.required_version,
                host_version: report.host_version,
            });
        }

        let declared: Vec<CapabilityType> = plugin.capabilities().iter().map(|c| c.kind).collect();
        let hooks = plugin.hooks();
        for kind in &declared {
            self.capability_index
                .entry(*kind)
                .or_default()
                .insert(id.clone());
        }
        self.records.insert(
            id.clone(),
            RegisteredPlugin {
                plugin: Arc::clone(&plugin),
                hooks,
                declared: declared.clone(),
            },
        );
        self.order.push(id.clone());

        // The plugin's own declarations already count as provided here, so a
        // plugin may satisfy its own requirements.
        let missing = self.unavailable_requirements(plugin.as_ref());
        if !missing.is_empty() {
            match self.dependency_policy {
                DependencyPolicy::Permissive => {
                    for kind in &missing {
                        warn!(
                            "Plugin '{}' requires capability '{}', which no policy or registered plugin provides",
                            id, kind
                        );
                    }
                }
                DependencyPolicy::Strict => {
                    self.unregister(&id);
                    return Err(PluginSystemError::MissingCapability {
                        plugin_id: id,
                        missing,
                    });
                }
            }
        }

        debug!(
            "Registered plugin '{}' v{} ({} capabilities)",
            id,
            plugin.version(),
            declared.len()
        );
        Ok(())
    }

    /// Removes a plugin, returning its handle if it was registered.
    ///
    /// The capability index is cleaned first, using the declared-capability
    /// snapshot taken at registration, then the order list and the id map.
    /// Emptied index buckets are dropped entirely.
    pub fn unregister(&mut self, id: &str) -> Option<Arc<dyn Plugin>> {
        let declared = self.records.get(id)?.declared.clone();
        for kind in &declared {
            if let Some(bucket) = self.capability_index.get_mut(kind) {
                bucket.remove(id);
                if bucket.is_empty() {
                    self.capability_index.remove(kind);
                }
            }
        }
        self.order.retain(|existing| existing != id);
        let record = self.records.remove(id)?;
        debug!("Unregistered plugin '{}'", id);
        Some(record.plugin)
    }

    pub fn get_plugin(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        self.records.get(id).map(|record| Arc::clone(&record.plugin))
    }

    pub fn get_record(&self, id: &str) -> Option<&RegisteredPlugin> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Plugin ids in registration order.
    pub fn plugin_ids(&self) -> Vec<String> {
        self.order.clone()
    }

    /// All plugin handles in registration order.
    pub fn all_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.order
            .iter()
            .filter_map(|id| self.get_plugin(id))
            .collect()
    }

    /// Registration-order snapshot of every record. The manager iterates
    /// this outside the registry lock, so mid-iteration mutations affect
    /// only the next pass.
    pub fn snapshot(&self) -> Vec<RegisteredPlugin> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    /// Plugins declaring the given capability type. Cost is proportional to
    /// the provider count, not the registry size; order is unspecified.
    pub fn plugins_by_capability(&self, kind: CapabilityType) -> Vec<Arc<dyn Plugin>> {
        match self.capability_index.get(&kind) {
            Some(bucket) => bucket
                .iter()
                .filter_map(|id| self.get_plugin(id))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Registered plugins whose requirement a hypothetical host version
    /// would satisfy. The configured host version is not consulted.
    pub fn compatible_plugins(&self, host_version: &str) -> Vec<Arc<dyn Plugin>> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .filter(|record| {
                check_compatibility(
                    record.plugin.as_ref(),
                    host_version,
                    self.capability_policy.as_ref(),
                )
                .compatible
            })
            .map(|record| Arc::clone(&record.plugin))
            .collect()
    }

    /// Fresh compatibility report for one plugin against the configured
    /// host version.
    pub fn compatibility_for(&self, id: &str) -> Option<CompatibilityReport> {
        self.records.get(id).map(|record| {
            check_compatibility(
                record.plugin.as_ref(),
                &self.host_version,
                self.capability_policy.as_ref(),
            )
        })
    }

    /// Provider overview for one capability type.
    pub fn capability_status(&self, kind: CapabilityType) -> CapabilityStatus {
        let providers: Vec<CapabilityProvider> = match self.capability_index.get(&kind) {
            Some(bucket) => bucket
                .iter()
                .filter_map(|id| self.records.get(id))
                .map(|record| CapabilityProvider {
                    plugin_id: record.plugin.id().to_string(),
                    plugin_name: record.plugin.name().to_string(),
                    active: true,
                })
                .collect(),
            None => Vec::new(),
        };
        CapabilityStatus {
            kind,
            provider_count: providers.len(),
            providers,
        }
    }

    /// Required capability types neither accepted by the policy nor
    /// declared by any registered plugin. Empty under a policy that
    /// accepts everything.
    fn unavailable_requirements(&self, plugin: &dyn Plugin) -> Vec<CapabilityType> {
        plugin
            .required_capabilities()
            .into_iter()
            .filter(|kind| {
                !self.capability_policy.accepts(*kind)
                    && self
                        .capability_index
                        .get(kind)
                        .is_none_or(|bucket| bucket.is_empty())
            })
            .collect()
    }
}
