//! Domain layer - Core business objects and capability traits
//!
//! This layer contains:
//! - Entities: events, users and the persistent records (approvals, stats, logs)
//! - Traits: abstractions for infrastructure (EventGateway, Store)

pub mod entities;
pub mod traits;
