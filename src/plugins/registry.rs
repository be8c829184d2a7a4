//! Plugin registry - Catalog of available modules and descriptors of loaded ones

use std::sync::Arc;

use super::trait_def::{Plugin, PluginFactory, PluginInfo};
use crate::application::errors::PluginError;
use crate::domain::entities::EventKind;
use crate::domain::traits::HandlerId;
use crate::infrastructure::config::PluginConfig;

/// Names that never show up in discovery
fn is_hidden(name: &str) -> bool {
    name.starts_with('_') || name == "mod"
}

/// Lowercase, trimmed module name
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Clone)]
struct CatalogEntry {
    name: String,
    factory: PluginFactory,
}

/// Ordered set of plugin factories known to the bot
#[derive(Clone, Default)]
pub struct PluginCatalog {
    entries: Vec<CatalogEntry>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory under `name`; a repeated name replaces the earlier entry
    pub fn register<F, P>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: Plugin + 'static,
    {
        let name = normalize_name(name);
        let factory: PluginFactory = Arc::new(move || Arc::new(factory()) as Arc<dyn Plugin>);
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.factory = factory,
            None => self.entries.push(CatalogEntry { name, factory }),
        }
        self
    }

    /// Every name in registration order, hidden ones included
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn factory(&self, name: &str) -> Option<&PluginFactory> {
        self.entries.iter().find(|e| e.name == name).map(|e| &e.factory)
    }
}

/// A handler installed on behalf of a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRegistration {
    pub module: String,
    pub kind: EventKind,
    pub handle: HandlerId,
}

/// A loaded module: its instance and every handler installed for it
#[derive(Clone)]
pub struct PluginDescriptor {
    pub name: String,
    pub info: PluginInfo,
    pub registrations: Vec<HandlerRegistration>,
    instance: Arc<dyn Plugin>,
}

impl PluginDescriptor {
    pub fn new(name: &str, instance: Arc<dyn Plugin>, registrations: Vec<HandlerRegistration>) -> Self {
        Self {
            name: name.to_string(),
            info: instance.info(),
            registrations,
            instance,
        }
    }

    pub fn instance(&self) -> &Arc<dyn Plugin> {
        &self.instance
    }

    pub fn handler_count(&self) -> usize {
        self.registrations.len()
    }
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("info", &self.info)
            .field("registrations", &self.registrations)
            .finish_non_exhaustive()
    }
}

/// Registry for managing loaded plugins
///
/// Not synchronized on its own; the manager owns it behind a lock.
pub struct PluginRegistry {
    catalog: PluginCatalog,
    plugins: PluginConfig,
    loaded: Vec<PluginDescriptor>,
}

impl PluginRegistry {
    pub fn new(catalog: PluginCatalog, plugins: PluginConfig) -> Self {
        Self {
            catalog,
            plugins,
            loaded: Vec::new(),
        }
    }

    /// Loadable module names, in catalog order
    pub fn discover(&self) -> Vec<String> {
        self.catalog.names().into_iter().filter(|n| !is_hidden(n)).collect()
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.plugins.is_disabled(name)
    }

    /// Whether `name` is a discoverable catalog entry
    pub fn contains(&self, name: &str) -> bool {
        !is_hidden(name) && self.catalog.factory(name).is_some()
    }

    /// Build a fresh instance of a discoverable module
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Plugin>, PluginError> {
        if is_hidden(name) {
            return Err(PluginError::NotFound(name.to_string()));
        }
        self.catalog
            .factory(name)
            .map(|factory| factory())
            .ok_or_else(|| PluginError::NotFound(name.to_string()))
    }

    /// Record a module as loaded
    pub fn mark_loaded(&mut self, descriptor: PluginDescriptor) -> Result<(), PluginError> {
        if self.is_loaded(&descriptor.name) {
            return Err(PluginError::AlreadyLoaded(descriptor.name));
        }
        self.loaded.push(descriptor);
        Ok(())
    }

    /// Forget a loaded module, handing back its descriptor
    pub fn mark_unloaded(&mut self, name: &str) -> Result<PluginDescriptor, PluginError> {
        let index = self
            .loaded
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        Ok(self.loaded.remove(index))
    }

    /// Loaded modules in load order
    pub fn list(&self) -> &[PluginDescriptor] {
        &self.loaded
    }

    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.loaded.iter().find(|d| d.name == name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn loaded_names(&self) -> Vec<String> {
        self.loaded.iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}
