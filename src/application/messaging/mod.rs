//! Message handling - command parsing and event filters

pub mod filters;
pub mod parser;

pub use filters::{Filter, Predicate};
pub use parser::{CommandParser, ParsedCommand};
