//! Compatibility reporting between a plugin and the running host.

use serde::Serialize;

use crate::plugin_system::capability::{CapabilityPolicy, CapabilityType};
use crate::plugin_system::traits::Plugin;
use crate::plugin_system::version::{VersionRange, parse_version, satisfies_version};

/// Plugin versions below this line are flagged as stale.
const STABLE_VERSION_FLOOR: (u64, u64, u64) = (1, 0, 0);

/// Full verdict on whether a plugin can run on a given host.
///
/// `compatible` reflects the version check alone. Missing capabilities and
/// warnings are advisory; the registry decides separately how hard to
/// enforce them.
#[derive(Debug, Clone, Serialize)]
pub struct CompatibilityReport {
    pub compatible: bool,
    pub host_version: String,
    pub required_version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_capabilities: Vec<CapabilityType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

impl CompatibilityReport {
    /// Compatible with nothing to flag at all.
    pub fn is_clean(&self) -> bool {
        self.compatible && self.missing_capabilities.is_empty() && self.warnings.is_empty()
    }
}

/// Builds a compatibility report for a plugin against a host version and
/// capability policy.
///
/// Computed fresh on every call; nothing is cached, so a host version
/// change is reflected immediately. An unparseable required range simply
/// yields `compatible: false`.
pub fn check_compatibility(
    plugin: &dyn Plugin,
    host_version: &str,
    policy: &dyn CapabilityPolicy,
) -> CompatibilityReport {
    let required_version = plugin.required_host_version().to_string();
    let compatible = satisfies_version(host_version, &required_version);

    let missing_capabilities: Vec<CapabilityType> = plugin
        .required_capabilities()
        .into_iter()
        .filter(|kind| !policy.accepts(*kind))
        .collect();

    let mut warnings = Vec::new();
    let mut recommendations = Vec::new();

    if !compatible {
        recommendations.push(format!(
            "Upgrade the host to a version satisfying '{}'",
            required_version
        ));
    }

    match parse_version(plugin.version()) {
        Ok(version) if (version.major, version.minor, version.patch) < STABLE_VERSION_FLOOR => {
            warnings.push(format!(
                "Plugin version {} predates the 1.0.0 stability line and may rely on unstable host behavior",
                plugin.version()
            ));
            recommendations.push(format!(
                "Contact the author of '{}' for an updated release",
                plugin.name()
            ));
        }
        Ok(_) => {}
        Err(_) => {
            warnings.push(format!(
                "Plugin version '{}' is not a valid version string",
                plugin.version()
            ));
        }
    }

    if let Ok(range) = VersionRange::parse(&required_version) {
        if range.is_narrow() {
            warnings.push(format!(
                "Required host version '{}' is very narrow and will reject routine host upgrades",
                required_version
            ));
        }
    }

    if !missing_capabilities.is_empty() {
        recommendations.push(format!(
            "Ensure the host enables these capabilities: {missing_capabilities:?}"
        ));
    }

    CompatibilityReport {
        compatible,
        host_version: host_version.to_string(),
        required_version,
        missing_capabilities,
        warnings,
        recommendations,
    }
}
