// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "ledger/dispatcher.rs"]
pub mod dispatcher;

// Re-export command types for convenience
pub use commands::ledger::{Context, Data, Error};
