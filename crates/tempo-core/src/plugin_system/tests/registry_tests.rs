use std::sync::Arc;

use async_trait::async_trait;

use crate::plugin_system::capability::{
    AcceptAllCapabilities, Capability, CapabilityAllowList, CapabilityType, DependencyPolicy,
};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::registry::PluginRegistry;
use crate::plugin_system::settings::{PluginSettings, SettingsUpdate};
use crate::plugin_system::traits::{HookSet, Plugin, PluginHook};

// --- Mock Plugin for Registry Tests ---
struct MockRegistryPlugin {
    id: String,
    version: String,
    required_host_version: String,
    provides: Vec<CapabilityType>,
    requires: Vec<CapabilityType>,
    hooks: HookSet,
}

impl MockRegistryPlugin {
    fn default(id: &str) -> Self {
        Self {
            id: id.to_string(),
            version: "1.0.0".to_string(),
            required_host_version: ">=0.1.0".to_string(),
            provides: vec![],
            requires: vec![],
            hooks: HookSet::empty(),
        }
    }

    fn with_required_host_version(id: &str, range: &str) -> Self {
        Self {
            required_host_version: range.to_string(),
            ..Self::default(id)
        }
    }

    fn providing(mut self, kinds: Vec<CapabilityType>) -> Self {
        self.provides = kinds;
        self
    }

    fn requiring(mut self, kinds: Vec<CapabilityType>) -> Self {
        self.requires = kinds;
        self
    }

    fn with_hooks(mut self, hooks: HookSet) -> Self {
        self.hooks = hooks;
        self
    }
}

#[async_trait]
impl Plugin for MockRegistryPlugin {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.id
    }
    fn version(&self) -> &str {
        &self.version
    }
    fn required_host_version(&self) -> &str {
        &self.required_host_version
    }
    fn required_capabilities(&self) -> Vec<CapabilityType> {
        self.requires.clone()
    }
    fn capabilities(&self) -> Vec<Capability> {
        self.provides
            .iter()
            .map(|kind| Capability::new(*kind, "Mock capability", false))
            .collect()
    }
    fn hooks(&self) -> HookSet {
        self.hooks
    }
    async fn initialize(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }
    async fn destroy(&self) -> Result<(), PluginSystemError> {
        Ok(())
    }
    async fn get_settings(&self) -> Result<PluginSettings, PluginSystemError> {
        Ok(PluginSettings::default())
    }
    async fn update_settings(&self, _update: SettingsUpdate) -> Result<(), PluginSystemError> {
        Ok(())
    }
}

fn create_test_registry() -> PluginRegistry {
    PluginRegistry::new(
        "1.0.0",
        Arc::new(AcceptAllCapabilities),
        DependencyPolicy::Permissive,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new() {
        let registry = create_test_registry();
        assert_eq!(registry.len(), 0);
        assert!(registry.is_empty());
        assert_eq!(registry.host_version(), "1.0.0");
    }

    #[test]
    fn test_register_plugin_success() {
        let mut registry = create_test_registry();
        let result = registry.register(Arc::new(MockRegistryPlugin::default("plugin1")));
        assert!(result.is_ok());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("plugin1"));
        assert!(registry.get_plugin("plugin1").is_some());
    }

    #[test]
    fn test_register_duplicate_plugin() {
        let mut registry = create_test_registry();
        registry
            .register(Arc::new(MockRegistryPlugin::default("plugin1")))
            .unwrap();
        let result = registry.register(Arc::new(MockRegistryPlugin::default("plugin1")));
        assert!(matches!(
            result,
            Err(PluginSystemError::AlreadyRegistered(id)) if id == "plugin1"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_incompatible_version_is_atomic() {
        let mut registry = create_test_registry();
        let plugin = Arc::new(
            MockRegistryPlugin::with_required_host_version("incompatible", ">=2.0.0")
                .providing(vec![CapabilityType::Sync]),
        );
        let result = registry.register(plugin);
        assert!(matches!(
            result,
            Err(PluginSystemError::IncompatibleVersion { ref plugin_id, .. }) if plugin_id == "incompatible"
        ));
        // No trace anywhere: not in the map, not in the capability index
        assert_eq!(registry.len(), 0);
        assert!(registry.all_plugins().is_empty());
        assert!(registry.plugins_by_capability(CapabilityType::Sync).is_empty());
    }

    #[test]
    fn test_registration_order_preserved() {
        let mut registry = create_test_registry();
        for id in ["alpha", "beta", "gamma"] {
            registry
                .register(Arc::new(MockRegistryPlugin::default(id)))
                .unwrap();
        }
        assert_eq!(registry.plugin_ids(), vec!["alpha", "beta", "gamma"]);
        let snapshot: Vec<String> = registry
            .snapshot()
            .iter()
            .map(|record| record.plugin().id().to_string())
            .collect();
        assert_eq!(snapshot, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_unregister_cleans_capability_index() {
        let mut registry = create_test_registry();
        let declared = vec![CapabilityType::Sync, CapabilityType::Calendar];
        registry
            .register(Arc::new(
                MockRegistryPlugin::default("provider").providing(declared.clone()),
            ))
            .unwrap();
        for kind in &declared {
            assert_eq!(registry.plugins_by_capability(*kind).len(), 1);
        }

        let removed = registry.unregister("provider");
        assert!(removed.is_some());
        assert_eq!(registry.len(), 0);
        for kind in &declared {
            assert!(
                registry.plugins_by_capability(*kind).is_empty(),
                "Stale index entry for {:?}",
                kind
            );
        }
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let mut registry = create_test_registry();
        assert!(registry.unregister("ghost").is_none());
    }

    #[test]
    fn test_unregister_leaves_other_providers() {
        let mut registry = create_test_registry();
        registry
            .register(Arc::new(
                MockRegistryPlugin::default("a").providing(vec![CapabilityType::Sync]),
            ))
            .unwrap();
        registry
            .register(Arc::new(
                MockRegistryPlugin::default("b").providing(vec![CapabilityType::Sync]),
            ))
            .unwrap();

        registry.unregister("a");
        let providers = registry.plugins_by_capability(CapabilityType::Sync);
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].id(), "b");
    }

    #[test]
    fn test_plugins_by_capability_unknown_kind() {
        let registry = create_test_registry();
        assert!(registry.plugins_by_capability(CapabilityType::Music).is_empty());
    }

    #[test]
    fn test_compatible_plugins_is_a_what_if_query() {
        let mut registry = create_test_registry();
        registry
            .register(Arc::new(MockRegistryPlugin::with_required_host_version(
                "broad", ">=0.1.0",
            )))
            .unwrap();
        registry
            .register(Arc::new(MockRegistryPlugin::with_required_host_version(
                "picky", "^1.0.0",
            )))
            .unwrap();

        // Against a hypothetical 2.0.0 host, only the broad range survives;
        // the registry's own configured version stays untouched
        let survivors: Vec<String> = registry
            .compatible_plugins("2.0.0")
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(survivors, vec!["broad"]);
        assert_eq!(registry.host_version(), "1.0.0");

        let all: Vec<String> = registry
            .compatible_plugins("1.5.0")
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(all, vec!["broad", "picky"]);
    }

    #[test]
    fn test_set_host_version_affects_future_checks() {
        let mut registry = create_test_registry();
        registry
            .register(Arc::new(MockRegistryPlugin::with_required_host_version(
                "plugin1", "^1.0.0",
            )))
            .unwrap();
        assert!(registry.compatibility_for("plugin1").unwrap().compatible);

        registry.set_host_version("2.0.0");
        let report = registry.compatibility_for("plugin1").unwrap();
        assert!(!report.compatible, "Reports are computed fresh per call");
        assert_eq!(report.host_version, "2.0.0");

        // Already-registered plugins are not evicted by a version change
        assert!(registry.contains("plugin1"));
    }

    #[test]
    fn test_capability_status_reports_providers_optimistically() {
        let mut registry = create_test_registry();
        registry
            .register(Arc::new(
                MockRegistryPlugin::default("provider").providing(vec![CapabilityType::Calendar]),
            ))
            .unwrap();

        let status = registry.capability_status(CapabilityType::Calendar);
        assert_eq!(status.provider_count, 1);
        assert_eq!(status.providers[0].plugin_id, "provider");
        assert!(status.providers[0].active, "No liveness signal here, so providers report active");

        let none = registry.capability_status(CapabilityType::Webhook);
        assert_eq!(none.provider_count, 0);
        assert!(none.providers.is_empty());
    }

    #[test]
    fn test_permissive_policy_keeps_plugin_with_missing_requirement() {
        let mut registry = PluginRegistry::new(
            "1.0.0",
            Arc::new(CapabilityAllowList::new([CapabilityType::Calendar])),
            DependencyPolicy::Permissive,
        );
        let result = registry.register(Arc::new(
            MockRegistryPlugin::default("needy").requiring(vec![CapabilityType::OAuth]),
        ));
        assert!(result.is_ok(), "Permissive policy only warns");
        assert!(registry.contains("needy"));
    }

    #[test]
    fn test_strict_policy_rolls_back_on_missing_requirement() {
        let mut registry = PluginRegistry::new(
            "1.0.0",
            Arc::new(CapabilityAllowList::new([CapabilityType::Calendar])),
            DependencyPolicy::Strict,
        );
        let result = registry.register(Arc::new(
            MockRegistryPlugin::default("needy")
                .providing(vec![CapabilityType::Calendar])
                .requiring(vec![CapabilityType::OAuth]),
        ));
        assert!(matches!(
            result,
            Err(PluginSystemError::MissingCapability { ref missing, .. })
                if missing == &vec![CapabilityType::OAuth]
        ));
        // Rolled back completely, including its own declared capabilities
        assert_eq!(registry.len(), 0);
        assert!(registry.plugins_by_capability(CapabilityType::Calendar).is_empty());
    }

    #[test]
    fn test_strict_policy_accepts_requirement_covered_by_provider() {
        let mut registry = PluginRegistry::new(
            "1.0.0",
            Arc::new(CapabilityAllowList::new([CapabilityType::Calendar])),
            DependencyPolicy::Strict,
        );
        registry
            .register(Arc::new(
                MockRegistryPlugin::default("oauth-provider").providing(vec![CapabilityType::OAuth]),
            ))
            .unwrap();
        let result = registry.register(Arc::new(
            MockRegistryPlugin::default("consumer").requiring(vec![CapabilityType::OAuth]),
        ));
        assert!(
            result.is_ok(),
            "A registered provider satisfies the requirement even when the policy rejects it"
        );
    }

    #[test]
    fn test_hooks_snapshotted_at_registration() {
        let mut registry = create_test_registry();
        registry
            .register(Arc::new(MockRegistryPlugin::default("hooked").with_hooks(
                HookSet::empty().with(PluginHook::Sync).with(PluginHook::EventCreated),
            )))
            .unwrap();

        let record = registry.get_record("hooked").unwrap();
        assert!(record.hooks().contains(PluginHook::Sync));
        assert!(record.hooks().contains(PluginHook::EventCreated));
        assert!(!record.hooks().contains(PluginHook::Status));
    }
}
