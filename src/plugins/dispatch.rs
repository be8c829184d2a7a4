//! Dispatch table - Per-module bookkeeping of handlers installed on the gateway
//!
//! Every handler a module installs is gated behind the module's live flag.
//! The flag is raised only once the whole set is installed and lowered before
//! the first handler is removed, so events never see half a module.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::registry::HandlerRegistration;
use super::trait_def::HandlerSpec;
use crate::application::errors::PluginError;
use crate::application::messaging::Filter;
use crate::domain::traits::{EventGateway, HandlerId};

struct ModuleHandles {
    live: Arc<AtomicBool>,
    handles: Vec<HandlerId>,
}

impl ModuleHandles {
    fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }
}

/// Handles installed on the gateway, grouped by owning module
pub struct DispatchTable {
    gateway: Arc<dyn EventGateway>,
    modules: HashMap<String, ModuleHandles>,
}

impl DispatchTable {
    pub fn new(gateway: Arc<dyn EventGateway>) -> Self {
        Self {
            gateway,
            modules: HashMap::new(),
        }
    }

    /// Install one handler for `module`; it stays dormant until `activate`
    pub fn install(&mut self, module: &str, spec: HandlerSpec) -> Result<HandlerRegistration, PluginError> {
        let entry = self
            .modules
            .entry(module.to_string())
            .or_insert_with(ModuleHandles::new);

        let live = entry.live.clone();
        let filter = Filter::custom(move |_| live.load(Ordering::Acquire)) & spec.filter;

        let handle = self
            .gateway
            .add_handler(spec.kind, filter, spec.handler)
            .map_err(|e| PluginError::install(module, e))?;
        entry.handles.push(handle);

        tracing::debug!("Installed {} handler {} for {}", spec.kind, handle, module);
        Ok(HandlerRegistration {
            module: module.to_string(),
            kind: spec.kind,
            handle,
        })
    }

    /// Let events reach every handler of `module`
    pub fn activate(&self, module: &str) {
        if let Some(entry) = self.modules.get(module) {
            entry.live.store(true, Ordering::Release);
        }
    }

    /// Silence and remove every handler of `module`. Returns how many
    /// handles were dropped from the table; safe to call repeatedly.
    pub fn remove_all(&mut self, module: &str) -> usize {
        let Some(entry) = self.modules.remove(module) else {
            return 0;
        };
        entry.live.store(false, Ordering::Release);

        let count = entry.handles.len();
        for handle in entry.handles {
            if let Err(e) = self.gateway.remove_handler(handle) {
                tracing::warn!("Failed to remove handler {} of {}: {}", handle, module, e);
            }
        }
        count
    }

    pub fn handle_count(&self, module: &str) -> usize {
        self.modules.get(module).map(|m| m.handles.len()).unwrap_or(0)
    }

    pub fn total_handles(&self) -> usize {
        self.modules.values().map(|m| m.handles.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Chat, Message, User};
    use crate::infrastructure::adapters::ConsoleGateway;
    use std::sync::atomic::AtomicUsize;

    fn counting_spec(hits: Arc<AtomicUsize>) -> HandlerSpec {
        HandlerSpec::message(Filter::All, move |_message| {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_handlers_stay_dormant_until_activated() {
        let gateway = Arc::new(ConsoleGateway::new(User::new(1)).quiet());
        let mut table = DispatchTable::new(gateway.clone());
        let hits = Arc::new(AtomicUsize::new(0));

        table.install("alive", counting_spec(hits.clone())).unwrap();
        table.install("alive", counting_spec(hits.clone())).unwrap();
        assert_eq!(table.handle_count("alive"), 2);

        let event = Message::new(1, Chat::private(5)).with_text("hi");
        assert_eq!(gateway.dispatch(event.clone().into()).await, 0);

        table.activate("alive");
        assert_eq!(gateway.dispatch(event.into()).await, 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_remove_all_is_idempotent() {
        let gateway = Arc::new(ConsoleGateway::new(User::new(1)).quiet());
        let mut table = DispatchTable::new(gateway.clone());

        table
            .install("ping", counting_spec(Arc::new(AtomicUsize::new(0))))
            .unwrap();
        table.activate("ping");

        assert_eq!(table.remove_all("ping"), 1);
        assert_eq!(table.remove_all("ping"), 0);
        assert_eq!(table.total_handles(), 0);
        assert_eq!(gateway.handler_count(), 0);
    }
}
