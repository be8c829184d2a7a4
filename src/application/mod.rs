//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Errors: Domain-specific errors
//! - Messaging: Command parsing and event filters

pub mod errors;
pub mod messaging;
