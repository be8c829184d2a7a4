//! Domain traits - Abstractions for infrastructure implementations

pub mod gateway;
pub mod store;

pub use gateway::{EventGateway, EventHandler, HandlerFuture, HandlerId};
pub use store::{Store, GLOBAL_SCOPE};
