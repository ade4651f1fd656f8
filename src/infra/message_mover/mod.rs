// Infra for the message mover - the serenity-backed platform.

pub mod serenity_platform;

pub use serenity_platform::{destination_from, source_message_from, SerenityPlatform};
