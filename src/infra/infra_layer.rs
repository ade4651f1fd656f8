// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "message_mover/mod.rs"]
pub mod message_mover;

#[path = "localization/json_catalog.rs"]
pub mod localization;
