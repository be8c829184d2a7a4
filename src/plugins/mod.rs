//! Plugin system
//!
//! Feature modules implement [`Plugin`] and are listed in a [`PluginCatalog`].
//! The [`PluginManager`] loads them, installs their handlers on the gateway,
//! and tears them down again.

pub mod builtin;
pub mod context;
pub mod dispatch;
pub mod manager;
pub mod registry;
pub mod trait_def;

pub use context::PluginContext;
pub use dispatch::DispatchTable;
pub use manager::{BatchReport, PluginManager, PluginStatus};
pub use registry::{HandlerRegistration, PluginCatalog, PluginDescriptor, PluginRegistry};
pub use trait_def::{HandlerSpec, Plugin, PluginFactory, PluginInfo};
