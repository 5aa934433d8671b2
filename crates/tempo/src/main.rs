use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use log::info;

use tempo_core::host::{ConfigError, HostConfig};
use tempo_core::plugin_system::manager::PluginManager;
use tempo_core::plugin_system::satisfies_version;
use tempo_core::plugin_system::status::SystemHealth;

// --- Import bundled plugins for static registration ---
use local_calendar::LocalCalendarPlugin;

/// Tempo: a plugin-driven calendar host
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Path to a TOML host configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage plugins
    Plugin {
        #[command(subcommand)]
        command: PluginCommand,
    },
    /// Show aggregate plugin system status
    Status,
    /// Run one sync pass over every syncable plugin
    Sync,
    /// Check a version against a requirement range
    Check {
        /// The version to test, e.g. 1.2.3
        version: String,
        /// The range to test against, e.g. ^1.0.0
        range: String,
    },
}

#[derive(Subcommand, Debug)]
enum PluginCommand {
    /// List registered plugins
    List,
    /// Show one plugin's status and compatibility
    Info {
        /// The id of the plugin
        id: String,
    },
    /// Enable a plugin
    Enable {
        /// The id of the plugin to enable
        id: String,
    },
    /// Disable a plugin
    Disable {
        /// The id of the plugin to disable
        id: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = CliArgs::parse();

    // The version check is pure computation; no host is started for it.
    if let Commands::Check { version, range } = &args.command {
        let ok = satisfies_version(version, range);
        println!("{}", ok);
        return if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE };
    }

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };
    info!("Starting Tempo host v{}", config.host_version);
    let manager = PluginManager::new(config);

    // --- Statically register bundled plugins ---
    if let Err(err) = manager
        .register_plugin(Arc::new(LocalCalendarPlugin::new()))
        .await
    {
        eprintln!("Failed to register bundled plugin: {}", err);
        return ExitCode::FAILURE;
    }
    if let Err(err) = manager.load_plugin(local_calendar::PLUGIN_ID).await {
        eprintln!("Failed to initialize bundled plugin: {}", err);
        return ExitCode::FAILURE;
    }

    let code = run_command(&manager, args.command).await;
    manager.destroy().await;
    code
}

fn load_config(path: Option<&Path>) -> Result<HostConfig, ConfigError> {
    match path {
        Some(path) => HostConfig::load(path),
        None => Ok(HostConfig::default()),
    }
}

async fn run_command(manager: &PluginManager, command: Commands) -> ExitCode {
    match command {
        Commands::Plugin { command } => run_plugin_command(manager, command).await,
        Commands::Status => {
            let status = manager.system_status().await;
            println!("System health: {}", status.health);
            println!(
                "Plugins: {} total, {} active, {} in error",
                status.total_plugins, status.active_plugins, status.error_plugins
            );
            for plugin in &status.plugins {
                match &plugin.last_error {
                    Some(error) => println!("  - {} [{}]: {}", plugin.id, plugin.state, error),
                    None => println!("  - {} [{}]", plugin.id, plugin.state),
                }
            }
            match status.health {
                SystemHealth::Error => ExitCode::FAILURE,
                _ => ExitCode::SUCCESS,
            }
        }
        Commands::Sync => {
            let results = manager.system_sync().await;
            if results.is_empty() {
                println!("No syncable plugins are enabled.");
                return ExitCode::SUCCESS;
            }
            let mut failed = 0;
            for result in &results {
                if result.success {
                    println!(
                        "  - {}: ok ({} imported, {} exported)",
                        result.plugin_id, result.events_imported, result.events_exported
                    );
                } else {
                    failed += 1;
                    println!(
                        "  - {}: failed ({})",
                        result.plugin_id,
                        result.errors.join("; ")
                    );
                }
            }
            if failed > 0 {
                eprintln!("{} of {} plugin(s) failed to sync", failed, results.len());
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Commands::Check { .. } => unreachable!("Handled before the host starts"),
    }
}

async fn run_plugin_command(manager: &PluginManager, command: PluginCommand) -> ExitCode {
    match command {
        PluginCommand::List => {
            let plugins = { manager.registry().lock().await.all_plugins() };
            if plugins.is_empty() {
                println!("No plugins registered.");
                return ExitCode::SUCCESS;
            }
            println!("Registered plugins:");
            for plugin in plugins {
                let state = match manager.plugin_status(plugin.id()).await {
                    Ok(status) => status.state.to_string(),
                    Err(_) => "unknown".to_string(),
                };
                println!(
                    "  - {} v{} [{}] {}",
                    plugin.id(),
                    plugin.version(),
                    state,
                    plugin.description()
                );
            }
            ExitCode::SUCCESS
        }
        PluginCommand::Info { id } => {
            let status = match manager.plugin_status(&id).await {
                Ok(status) => status,
                Err(err) => {
                    eprintln!("Error: {}", err);
                    return ExitCode::FAILURE;
                }
            };
            println!("Plugin: {}", id);
            println!("  State: {}", status.state);
            println!("  Errors seen: {}", status.error_count);
            if let Some(error) = &status.last_error {
                println!("  Last error: {}", error);
            }
            if !status.capabilities.is_empty() {
                let listed: Vec<&str> = status
                    .capabilities
                    .iter()
                    .map(|kind| kind.as_str())
                    .collect();
                println!("  Capabilities: {}", listed.join(", "));
            }
            let report = { manager.registry().lock().await.compatibility_for(&id) };
            if let Some(report) = report {
                println!(
                    "  Compatible: {} (requires '{}', host is {})",
                    report.compatible, report.required_version, report.host_version
                );
                for warning in &report.warnings {
                    println!("  Warning: {}", warning);
                }
                for recommendation in &report.recommendations {
                    println!("  Recommendation: {}", recommendation);
                }
            }
            ExitCode::SUCCESS
        }
        PluginCommand::Enable { id } => match manager.enable_plugin(&id).await {
            Ok(()) => {
                println!("Plugin '{}' enabled.", id);
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("Error enabling plugin '{}': {}", id, err);
                ExitCode::FAILURE
            }
        },
        PluginCommand::Disable { id } => match manager.disable_plugin(&id).await {
            Ok(()) => {
                println!("Plugin '{}' disabled.", id);
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("Error disabling plugin '{}': {}", id, err);
                ExitCode::FAILURE
            }
        },
    }
}
