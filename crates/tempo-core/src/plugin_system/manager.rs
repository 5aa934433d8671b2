//! # Tempo Core Plugin Manager
//!
//! Orchestrates plugin lifecycle, event routing, sync batches and status
//! aggregation over a shared [`PluginRegistry`].
//!
//! Fault isolation is the contract of every batch operation here: one
//! plugin failing, stalling or lying about its state never stops the pass
//! for the others. Per-plugin failures become log lines or data (status
//! entries, failed sync results), and the batch itself always completes.
//!
//! Two delivery disciplines exist and are deliberately distinct:
//! [`PluginManager::route_event`] and [`PluginManager::system_sync`] await
//! plugins one at a time in registration order, while
//! [`PluginManager::broadcast_event`] fans out to all targets at once and
//! awaits them jointly.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval, timeout};

use crate::event::ItemEvent;
use crate::host::HostConfig;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::registry::{PluginRegistry, RegisteredPlugin};
use crate::plugin_system::settings::SettingsUpdate;
use crate::plugin_system::status::{
    PluginState, PluginStatus, SyncPerformance, SyncResult, SystemHealth, SystemStatus,
};
use crate::plugin_system::traits::{Plugin, PluginHook};

/// Host-side plugin orchestrator. Share it as `Arc<PluginManager>`.
pub struct PluginManager {
    registry: Arc<Mutex<PluginRegistry>>,
    config: HostConfig,
    started_at: Instant,
    auto_sync_task: Mutex<Option<JoinHandle<()>>>,
}

impl PluginManager {
    pub fn new(config: HostConfig) -> Self {
        let registry = PluginRegistry::new(
            config.host_version.clone(),
            config.capability_policy(),
            config.dependency_policy,
        );
        Self {
            registry: Arc::new(Mutex::new(registry)),
            config,
            started_at: Instant::now(),
            auto_sync_task: Mutex::new(None),
        }
    }

    /// The shared registry. Lock it directly for discovery queries.
    pub fn registry(&self) -> &Arc<Mutex<PluginRegistry>> {
        &self.registry
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Seconds since this manager was constructed.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub async fn register_plugin(&self, plugin: Arc<dyn Plugin>) -> Result<(), PluginSystemError> {
        let mut registry = self.registry.lock().await;
        registry.register(plugin)
    }

    pub async fn unregister_plugin(&self, id: &str) -> Option<Arc<dyn Plugin>> {
        let mut registry = self.registry.lock().await;
        registry.unregister(id)
    }

    async fn require_plugin(&self, id: &str) -> Result<Arc<dyn Plugin>, PluginSystemError> {
        let registry = self.registry.lock().await;
        registry
            .get_plugin(id)
            .ok_or_else(|| PluginSystemError::PluginNotFound(id.to_string()))
    }

    /// Initializes an already-registered plugin.
    pub async fn load_plugin(&self, id: &str) -> Result<(), PluginSystemError> {
        let plugin = self.require_plugin(id).await?;
        self.call_initialize(&plugin).await
    }

    /// Destroys a plugin, then removes it from the registry. The plugin
    /// stays registered if its `destroy` fails.
    pub async fn unload_plugin(&self, id: &str) -> Result<(), PluginSystemError> {
        let plugin = self.require_plugin(id).await?;
        self.call_destroy(&plugin).await?;
        let mut registry = self.registry.lock().await;
        registry.unregister(id);
        info!("Plugin '{}' unloaded", id);
        Ok(())
    }

    /// Unload followed by re-register and initialize. Not atomic: once the
    /// unload has succeeded, any later failure leaves the plugin
    /// unregistered rather than restoring the previous state.
    pub async fn reload_plugin(&self, id: &str) -> Result<(), PluginSystemError> {
        let plugin = self.require_plugin(id).await?;
        self.unload_plugin(id).await?;
        {
            let mut registry = self.registry.lock().await;
            registry.register(Arc::clone(&plugin))?;
        }
        if let Err(err) = self.call_initialize(&plugin).await {
            let mut registry = self.registry.lock().await;
            registry.unregister(id);
            return Err(err);
        }
        info!("Plugin '{}' reloaded", id);
        Ok(())
    }

    /// Enables a plugin, then initializes it.
    pub async fn start_plugin(&self, id: &str) -> Result<(), PluginSystemError> {
        let plugin = self.require_plugin(id).await?;
        self.set_enabled(&plugin, true).await?;
        self.call_initialize(&plugin).await
    }

    /// Destroys a plugin, then disables it. The registration is kept.
    pub async fn stop_plugin(&self, id: &str) -> Result<(), PluginSystemError> {
        let plugin = self.require_plugin(id).await?;
        self.call_destroy(&plugin).await?;
        self.set_enabled(&plugin, false).await
    }

    pub async fn enable_plugin(&self, id: &str) -> Result<(), PluginSystemError> {
        let plugin = self.require_plugin(id).await?;
        self.set_enabled(&plugin, true).await
    }

    pub async fn disable_plugin(&self, id: &str) -> Result<(), PluginSystemError> {
        let plugin = self.require_plugin(id).await?;
        self.set_enabled(&plugin, false).await
    }

    /// Enabled state is plugin-owned. This round-trips through the
    /// plugin's own settings; the manager keeps no copy of the flag.
    async fn set_enabled(
        &self,
        plugin: &Arc<dyn Plugin>,
        enabled: bool,
    ) -> Result<(), PluginSystemError> {
        let limit = self.config.call_timeout();
        bounded_call(limit, plugin.id(), "get_settings", plugin.get_settings()).await?;
        bounded_call(
            limit,
            plugin.id(),
            "update_settings",
            plugin.update_settings(SettingsUpdate::enabled(enabled)),
        )
        .await?;
        info!(
            "Plugin '{}' {}",
            plugin.id(),
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    async fn call_initialize(&self, plugin: &Arc<dyn Plugin>) -> Result<(), PluginSystemError> {
        let limit = self.config.call_timeout();
        match bounded_call(limit, plugin.id(), "initialize", plugin.initialize()).await {
            Ok(()) => {
                info!("Plugin '{}' initialized", plugin.id());
                Ok(())
            }
            Err(err) => Err(PluginSystemError::InitializationFailed {
                plugin_id: plugin.id().to_string(),
                source: Box::new(err),
            }),
        }
    }

    async fn call_destroy(&self, plugin: &Arc<dyn Plugin>) -> Result<(), PluginSystemError> {
        let limit = self.config.call_timeout();
        match bounded_call(limit, plugin.id(), "destroy", plugin.destroy()).await {
            Ok(()) => Ok(()),
            Err(err) => Err(PluginSystemError::DestroyFailed {
                plugin_id: plugin.id().to_string(),
                source: Box::new(err),
            }),
        }
    }

    /// Delivers an event to every enabled plugin advertising the matching
    /// hook, one plugin at a time in registration order. Returns the number
    /// of plugins the event reached.
    ///
    /// Failures are contained per plugin: a handler error is logged and
    /// delivery moves on to the plugins registered after it.
    pub async fn route_event(&self, event: &ItemEvent) -> usize {
        let records = { self.registry.lock().await.snapshot() };
        let limit = self.config.call_timeout();
        let hook = hook_for_event(event);
        let mut delivered = 0;

        for record in records {
            let plugin = Arc::clone(record.plugin());
            let settings = match bounded_call(
                limit,
                plugin.id(),
                "get_settings",
                plugin.get_settings(),
            )
            .await
            {
                Ok(settings) => settings,
                Err(err) => {
                    warn!("Skipping plugin '{}' during routing: {}", plugin.id(), err);
                    continue;
                }
            };
            if !settings.enabled || !record.hooks().contains(hook) {
                continue;
            }
            match deliver(&plugin, event, limit).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    let err = PluginSystemError::EventDeliveryFailed {
                        plugin_id: plugin.id().to_string(),
                        source: Box::new(err),
                    };
                    error!("{}", err);
                }
            }
        }
        debug!("Event '{}' routed to {} plugin(s)", event.kind(), delivered);
        delivered
    }

    /// Fan-out variant of [`route_event`](Self::route_event): all target
    /// plugins are invoked together and awaited jointly. Per-event ordering
    /// across plugins is given up in exchange for latency; failure handling
    /// is unchanged.
    pub async fn broadcast_event(&self, event: &ItemEvent) -> usize {
        let records = { self.registry.lock().await.snapshot() };
        let limit = self.config.call_timeout();
        let hook = hook_for_event(event);
        let mut tasks: JoinSet<bool> = JoinSet::new();

        for record in records {
            if !record.hooks().contains(hook) {
                continue;
            }
            let plugin = Arc::clone(record.plugin());
            let event = event.clone();
            tasks.spawn(async move {
                let settings = match bounded_call(
                    limit,
                    plugin.id(),
                    "get_settings",
                    plugin.get_settings(),
                )
                .await
                {
                    Ok(settings) => settings,
                    Err(err) => {
                        warn!("Skipping plugin '{}' during broadcast: {}", plugin.id(), err);
                        return false;
                    }
                };
                if !settings.enabled {
                    return false;
                }
                match deliver(&plugin, &event, limit).await {
                    Ok(()) => true,
                    Err(err) => {
                        let err = PluginSystemError::EventDeliveryFailed {
                            plugin_id: plugin.id().to_string(),
                            source: Box::new(err),
                        };
                        error!("{}", err);
                        false
                    }
                }
            });
        }

        let mut delivered = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(err) => error!("Broadcast delivery task failed: {}", err),
            }
        }
        delivered
    }

    /// Status of a single plugin. Prefers the plugin's own `status` hook
    /// when advertised; otherwise derives one from its settings.
    pub async fn plugin_status(&self, id: &str) -> Result<PluginStatus, PluginSystemError> {
        let record = {
            let registry = self.registry.lock().await;
            registry.get_record(id).cloned()
        }
        .ok_or_else(|| PluginSystemError::PluginNotFound(id.to_string()))?;

        if record.hooks().contains(PluginHook::Status) {
            let limit = self.config.call_timeout();
            return bounded_call(limit, id, "status", record.plugin().status()).await;
        }
        Ok(self.derive_status(&record).await)
    }

    /// Settings-derived status entry. A settings failure becomes an error
    /// entry rather than propagating.
    async fn derive_status(&self, record: &RegisteredPlugin) -> PluginStatus {
        let plugin = record.plugin();
        let limit = self.config.call_timeout();
        let mut status =
            match bounded_call(limit, plugin.id(), "get_settings", plugin.get_settings()).await {
                Ok(settings) => {
                    let state = if settings.enabled {
                        PluginState::Active
                    } else {
                        PluginState::Inactive
                    };
                    PluginStatus::new(plugin.id(), state)
                }
                Err(err) => {
                    let mut status = PluginStatus::new(plugin.id(), PluginState::Error);
                    status.error_count = 1;
                    status.last_error = Some(err.to_string());
                    status
                }
            };
        status.capabilities = record.declared_capabilities().to_vec();
        status.health.uptime_secs = self.uptime_secs();
        status
    }

    /// Aggregate status over every registered plugin. Never fails: plugins
    /// whose settings cannot be read appear as error entries.
    pub async fn system_status(&self) -> SystemStatus {
        let records = { self.registry.lock().await.snapshot() };
        let mut plugins = Vec::with_capacity(records.len());
        for record in &records {
            plugins.push(self.derive_status(record).await);
        }

        let total_plugins = plugins.len();
        let error_plugins = plugins
            .iter()
            .filter(|status| status.state == PluginState::Error)
            .count();
        let active_plugins = plugins
            .iter()
            .filter(|status| status.state == PluginState::Active)
            .count();

        SystemStatus {
            total_plugins,
            active_plugins,
            error_plugins,
            health: SystemHealth::classify(error_plugins, total_plugins),
            plugins,
            generated_at: Utc::now(),
        }
    }

    /// Runs one sync pass: every enabled plugin advertising the sync hook
    /// is synced sequentially, in registration order. Always returns one
    /// result per participating plugin; a failing plugin contributes a
    /// failed result instead of aborting the batch.
    pub async fn system_sync(&self) -> Vec<SyncResult> {
        run_sync_pass(&self.registry, self.config.call_timeout()).await
    }

    /// Starts the recurring sync task if the config sets a period and no
    /// task is already running. Returns whether a task was started.
    ///
    /// Failures inside a cycle are logged and never cancel future cycles.
    pub async fn start_auto_sync(&self) -> bool {
        let period = match self.config.auto_sync_interval() {
            Some(period) => period,
            None => return false,
        };
        let mut slot = self.auto_sync_task.lock().await;
        if slot.is_some() {
            return false;
        }

        let registry = Arc::clone(&self.registry);
        let limit = self.config.call_timeout();
        *slot = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // An interval's first tick completes immediately; skip it so the
            // first sync runs one full period after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let results = run_sync_pass(&registry, limit).await;
                let failed = results.iter().filter(|result| !result.success).count();
                if failed > 0 {
                    warn!(
                        "Auto-sync cycle finished: {} of {} plugin(s) failed",
                        failed,
                        results.len()
                    );
                } else {
                    debug!("Auto-sync cycle finished ({} plugin(s))", results.len());
                }
            }
        }));
        info!("Auto-sync started (period {:?})", period);
        true
    }

    /// Stops the recurring sync task if one is running.
    pub async fn stop_auto_sync(&self) {
        let mut slot = self.auto_sync_task.lock().await;
        if let Some(task) = slot.take() {
            task.abort();
            debug!("Auto-sync stopped");
        }
    }

    /// Stops the auto-sync task, then calls `destroy` on every registered
    /// plugin, best-effort. Plugin failures are logged, never propagated.
    pub async fn destroy(&self) {
        self.stop_auto_sync().await;
        let plugins = { self.registry.lock().await.all_plugins() };
        let limit = self.config.call_timeout();
        for plugin in plugins {
            if let Err(err) =
                bounded_call(limit, plugin.id(), "destroy", plugin.destroy()).await
            {
                error!("Failed to destroy plugin '{}': {}", plugin.id(), err);
            }
        }
        info!("Plugin manager destroyed");
    }
}

/// Dispatches an event to the hook matching its kind.
async fn deliver(
    plugin: &Arc<dyn Plugin>,
    event: &ItemEvent,
    limit: Option<Duration>,
) -> Result<(), PluginSystemError> {
    let hook = hook_for_event(event);
    let call = async {
        match event {
            ItemEvent::Created { item } => plugin.on_event_created(item).await,
            ItemEvent::Updated { item } => plugin.on_event_updated(item).await,
            ItemEvent::Deleted { id } => plugin.on_event_deleted(id).await,
        }
    };
    bounded_call(limit, plugin.id(), hook.name(), call).await
}

fn hook_for_event(event: &ItemEvent) -> PluginHook {
    match event {
        ItemEvent::Created { .. } => PluginHook::EventCreated,
        ItemEvent::Updated { .. } => PluginHook::EventUpdated,
        ItemEvent::Deleted { .. } => PluginHook::EventDeleted,
    }
}

/// One sequential sync pass over the registry. Free-standing so the
/// auto-sync task can run it without holding a manager handle.
async fn run_sync_pass(
    registry: &Mutex<PluginRegistry>,
    limit: Option<Duration>,
) -> Vec<SyncResult> {
    let records = { registry.lock().await.snapshot() };
    let mut results = Vec::new();

    for record in records {
        let plugin = Arc::clone(record.plugin());
        let settings =
            match bounded_call(limit, plugin.id(), "get_settings", plugin.get_settings()).await {
                Ok(settings) => settings,
                Err(err) => {
                    warn!("Skipping sync for plugin '{}': {}", plugin.id(), err);
                    continue;
                }
            };
        if !settings.enabled || !record.hooks().contains(PluginHook::Sync) {
            continue;
        }

        let started = Instant::now();
        let result = match bounded_call(limit, plugin.id(), "sync", plugin.sync()).await {
            Ok(mut result) => {
                if result.performance.is_none() {
                    result.performance = Some(SyncPerformance {
                        duration_ms: started.elapsed().as_millis() as u64,
                    });
                }
                result
            }
            Err(err) => {
                warn!("Sync failed for plugin '{}': {}", plugin.id(), err);
                SyncResult::failure(plugin.id(), err.to_string())
            }
        };
        results.push(result);
    }
    results
}

/// Wraps a plugin call in the configured timeout, when one is set. Without
/// a limit a stalled plugin call blocks its pass, matching the historical
/// behavior.
async fn bounded_call<T>(
    limit: Option<Duration>,
    plugin_id: &str,
    operation: &str,
    fut: impl Future<Output = Result<T, PluginSystemError>>,
) -> Result<T, PluginSystemError> {
    match limit {
        Some(limit) => match timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(PluginSystemError::CallTimeout {
                plugin_id: plugin_id.to_string(),
                operation: operation.to_string(),
                timeout_ms: limit.as_millis() as u64,
            }),
        },
        None => fut.await,
    }
}
