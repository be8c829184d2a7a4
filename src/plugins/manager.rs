//! Plugin manager - handles plugin lifecycle
//!
//! Load, unload and reload of one module are serialized through a per-name
//! async lock held for the whole operation. Every one of them also holds a
//! shared lifecycle guard, which `unload_all` takes exclusively, so shutdown
//! waits for in-flight operations and no load slips past it. Registry and
//! dispatch table changes happen together under one short synchronous lock,
//! never across an await, so a module is either fully installed and recorded
//! or absent.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, info, warn};

use super::context::PluginContext;
use super::dispatch::DispatchTable;
use super::registry::{normalize_name, PluginCatalog, PluginDescriptor, PluginRegistry};
use super::trait_def::{HandlerSpec, Plugin, PluginInfo};
use crate::application::errors::PluginError;
use crate::domain::traits::{EventGateway, Store};
use crate::infrastructure::config::Config;

struct ManagerState {
    registry: PluginRegistry,
    dispatch: DispatchTable,
}

/// Outcome of `load_all` / `unload_all`
#[derive(Debug, Default)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<(String, PluginError)>,
    /// Non-fatal problems, such as a cleanup hook that failed
    pub warnings: Vec<(String, PluginError)>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty()
    }
}

/// Introspection snapshot of one module
#[derive(Debug, Clone, Serialize)]
pub struct PluginStatus {
    pub name: String,
    pub loaded: bool,
    pub disabled: bool,
    pub handlers: usize,
    pub info: PluginInfo,
}

/// Manages the lifecycle of every plugin for the bot
pub struct PluginManager {
    state: Mutex<ManagerState>,
    name_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    lifecycle: RwLock<()>,
    context: PluginContext,
}

impl PluginManager {
    /// Create a new plugin manager over a catalog of factories
    pub fn new(
        catalog: PluginCatalog,
        gateway: Arc<dyn EventGateway>,
        store: Arc<dyn Store>,
        config: Arc<Config>,
    ) -> Arc<Self> {
        let plugins = config.plugins.clone();
        Arc::new_cyclic(|weak| Self {
            state: Mutex::new(ManagerState {
                registry: PluginRegistry::new(catalog, plugins),
                dispatch: DispatchTable::new(gateway.clone()),
            }),
            name_locks: Mutex::new(HashMap::new()),
            lifecycle: RwLock::new(()),
            context: PluginContext::new(gateway, store, config).with_manager(weak.clone()),
        })
    }

    /// Context handed to plugins
    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, ManagerState>, PluginError> {
        self.state
            .lock()
            .map_err(|_| PluginError::Internal("Lock poisoned".to_string()))
    }

    /// Per-name lock; only catalog entries and loaded modules get one
    fn name_lock(&self, name: &str) -> Result<Arc<AsyncMutex<()>>, PluginError> {
        {
            let state = self.lock_state()?;
            if !state.registry.contains(name) && !state.registry.is_loaded(name) {
                return Err(PluginError::NotFound(name.to_string()));
            }
        }
        let mut locks = self
            .name_locks
            .lock()
            .map_err(|_| PluginError::Internal("Lock poisoned".to_string()))?;
        Ok(locks.entry(name.to_string()).or_default().clone())
    }

    /// Loadable module names in discovery order
    pub fn discover(&self) -> Vec<String> {
        self.lock_state().map(|s| s.registry.discover()).unwrap_or_default()
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.lock_state()
            .map(|s| s.registry.is_disabled(name))
            .unwrap_or(false)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        let name = normalize_name(name);
        self.lock_state()
            .map(|s| s.registry.is_loaded(&name))
            .unwrap_or(false)
    }

    /// Names of loaded modules in load order
    pub fn loaded_names(&self) -> Vec<String> {
        self.lock_state()
            .map(|s| s.registry.loaded_names())
            .unwrap_or_default()
    }

    /// Handlers currently installed for a module
    pub fn handler_count(&self, name: &str) -> usize {
        let name = normalize_name(name);
        self.lock_state()
            .map(|s| s.dispatch.handle_count(&name))
            .unwrap_or(0)
    }

    /// Handlers currently installed across all modules
    pub fn total_handlers(&self) -> usize {
        self.lock_state()
            .map(|s| s.dispatch.total_handles())
            .unwrap_or(0)
    }

    /// Loaded modules in load order
    pub fn list(&self) -> Vec<PluginStatus> {
        let Ok(state) = self.lock_state() else {
            return Vec::new();
        };
        state
            .registry
            .list()
            .iter()
            .map(|d| PluginStatus {
                name: d.name.clone(),
                loaded: true,
                disabled: state.registry.is_disabled(&d.name),
                handlers: d.handler_count(),
                info: d.info.clone(),
            })
            .collect()
    }

    /// Every discoverable module, loaded or not, in discovery order
    pub fn catalog(&self) -> Vec<PluginStatus> {
        let Ok(state) = self.lock_state() else {
            return Vec::new();
        };
        state
            .registry
            .discover()
            .into_iter()
            .map(|name| Self::status_of(&state, name))
            .collect()
    }

    /// Snapshot of one module, loaded or not
    pub fn info(&self, name: &str) -> Option<PluginStatus> {
        let name = normalize_name(name);
        let state = self.lock_state().ok()?;
        if !state.registry.is_loaded(&name) && state.registry.resolve(&name).is_err() {
            return None;
        }
        Some(Self::status_of(&state, name))
    }

    fn status_of(state: &ManagerState, name: String) -> PluginStatus {
        match state.registry.get(&name) {
            Some(d) => PluginStatus {
                loaded: true,
                disabled: state.registry.is_disabled(&name),
                handlers: d.handler_count(),
                info: d.info.clone(),
                name,
            },
            None => PluginStatus {
                loaded: false,
                disabled: state.registry.is_disabled(&name),
                handlers: 0,
                info: state
                    .registry
                    .resolve(&name)
                    .map(|p| p.info())
                    .unwrap_or_else(|_| PluginInfo::new(&name)),
                name,
            },
        }
    }

    /// Load every discovered module that is not disabled
    pub async fn load_all(&self) -> BatchReport {
        let discovered = self.discover();
        let mut report = BatchReport::default();

        for name in &discovered {
            if self.is_disabled(name) {
                info!("Plugin disabled, skipping: {}", name);
                continue;
            }
            report.attempted += 1;
            match self.load(name).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    warn!("Failed to load plugin {}: {}", name, e);
                    report.failures.push((name.clone(), e));
                }
            }
        }

        info!("Loaded {}/{} plugins", report.succeeded, discovered.len());
        report
    }

    /// Load one module by name
    pub async fn load(&self, name: &str) -> Result<(), PluginError> {
        let name = normalize_name(name);
        let _lifecycle = self.lifecycle.read().await;
        let lock = self.name_lock(&name)?;
        let _guard = lock.lock().await;
        self.load_locked(&name).await
    }

    async fn load_locked(&self, name: &str) -> Result<(), PluginError> {
        let plugin = self.fresh_instance(name)?;

        plugin
            .init(&self.context)
            .await
            .map_err(|e| PluginError::init(name, e))?;

        let specs = plugin.handlers(&self.context);
        if let Err(e) = self.install(name, plugin.clone(), specs) {
            // Undo whatever init set up
            if let Err(cleanup_err) = plugin.cleanup().await {
                warn!("Cleanup after failed load of {} also failed: {}", name, cleanup_err);
            }
            return Err(e);
        }

        info!("Plugin loaded: {}", name);
        Ok(())
    }

    fn fresh_instance(&self, name: &str) -> Result<Arc<dyn Plugin>, PluginError> {
        let state = self.lock_state()?;
        if state.registry.is_loaded(name) {
            return Err(PluginError::AlreadyLoaded(name.to_string()));
        }
        state.registry.resolve(name)
    }

    fn install(&self, name: &str, plugin: Arc<dyn Plugin>, specs: Vec<HandlerSpec>) -> Result<(), PluginError> {
        let mut guard = self.lock_state()?;
        let state = &mut *guard;

        let mut registrations = Vec::with_capacity(specs.len());
        for spec in specs {
            match state.dispatch.install(name, spec) {
                Ok(registration) => registrations.push(registration),
                Err(e) => {
                    let removed = state.dispatch.remove_all(name);
                    warn!("Rolled back {} handler(s) of {}", removed, name);
                    return Err(e);
                }
            }
        }

        let count = registrations.len();
        if let Err(e) = state
            .registry
            .mark_loaded(PluginDescriptor::new(name, plugin, registrations))
        {
            state.dispatch.remove_all(name);
            return Err(e);
        }
        state.dispatch.activate(name);

        debug!("Installed {} handler(s) for {}", count, name);
        Ok(())
    }

    /// Unload one module by name. A failing cleanup hook is logged, not returned.
    pub async fn unload(&self, name: &str) -> Result<(), PluginError> {
        if let Some(warning) = self.unload_reporting(name).await? {
            warn!("{}", warning);
        }
        Ok(())
    }

    /// Unload, handing back the cleanup failure if there was one
    async fn unload_reporting(&self, name: &str) -> Result<Option<PluginError>, PluginError> {
        let name = normalize_name(name);
        let _lifecycle = self.lifecycle.read().await;
        let lock = self.name_lock(&name)?;
        let _guard = lock.lock().await;
        self.unload_locked(&name).await
    }

    async fn unload_locked(&self, name: &str) -> Result<Option<PluginError>, PluginError> {
        let descriptor = self.detach(name)?;

        let warning = match descriptor.instance().cleanup().await {
            Ok(()) => None,
            Err(e) => Some(PluginError::cleanup(name, e)),
        };

        info!(
            "Plugin unloaded: {} ({} handler(s) removed)",
            name,
            descriptor.handler_count()
        );
        Ok(warning)
    }

    fn detach(&self, name: &str) -> Result<PluginDescriptor, PluginError> {
        let mut guard = self.lock_state()?;
        let state = &mut *guard;
        if !state.registry.is_loaded(name) {
            return Err(PluginError::NotFound(name.to_string()));
        }
        state.dispatch.remove_all(name);
        state.registry.mark_unloaded(name)
    }

    /// Unload then load with a fresh instance. A module that was not loaded
    /// is simply loaded.
    pub async fn reload(&self, name: &str) -> Result<(), PluginError> {
        let name = normalize_name(name);
        let _lifecycle = self.lifecycle.read().await;
        let lock = self.name_lock(&name)?;
        let _guard = lock.lock().await;

        match self.unload_locked(&name).await {
            Ok(Some(warning)) => warn!("{}", warning),
            Ok(None) => {}
            Err(e) if e.is_not_found() => debug!("Plugin {} was not loaded, loading fresh", name),
            Err(e) => return Err(e),
        }

        self.load_locked(&name).await?;
        info!("Plugin reloaded: {}", name);
        Ok(())
    }

    /// Unload every loaded module; leaves no handler installed.
    ///
    /// Waits for in-flight load, unload and reload calls and holds off new ones
    /// until every module has been unloaded with its cleanup hook.
    pub async fn unload_all(&self) -> BatchReport {
        let _lifecycle = self.lifecycle.write().await;
        let mut report = BatchReport::default();

        for name in self.loaded_names() {
            report.attempted += 1;
            match self.unload_locked(&name).await {
                Ok(None) => report.succeeded += 1,
                Ok(Some(warning)) => {
                    warn!("{}", warning);
                    report.succeeded += 1;
                    report.warnings.push((name, warning));
                }
                Err(e) => {
                    warn!("Failed to unload plugin {}: {}", name, e);
                    report.failures.push((name, e));
                }
            }
        }

        info!("Unloaded {}/{} plugins", report.succeeded, report.attempted);
        report
    }
}
