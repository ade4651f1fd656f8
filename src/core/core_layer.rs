// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "message_mover/mod.rs"]
pub mod message_mover;

#[path = "localization/message_catalog.rs"]
pub mod localization;
