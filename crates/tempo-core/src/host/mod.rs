//! Host-side configuration for the plugin system.

pub mod config;

/// Re-export important types
pub use config::{ConfigError, DEFAULT_HOST_VERSION, HostConfig};
