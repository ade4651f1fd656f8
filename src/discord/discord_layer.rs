// Discord layer - commands and the notices they post.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "message_manager/move_notifier.rs"]
pub mod notifier;

// Re-export command types for convenience
pub use commands::message_manager::{Data, Error};
