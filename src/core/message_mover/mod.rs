// Core message mover module - relocates messages between channels through
// short-lived impersonation webhooks ("relays").
// Same layout as the other core modules: models, ports, service.

pub mod channel_resolver;
pub mod message_copier;
pub mod mover_errors;
pub mod mover_models;
pub mod mover_service;
pub mod permission_gate;
pub mod platform;
pub mod range_collector;
pub mod webhook_relay;

#[cfg(test)]
mod test_support;

pub use mover_errors::*;
pub use mover_models::*;
pub use mover_service::MessageMoverService;
pub use platform::{ChatPlatform, MoveNotifier};
