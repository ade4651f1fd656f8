// This is the entry point of the message mover bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (Discord API, locale files)
// - `discord/` = Discord-specific adapters (commands, notices)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Register commands

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::message_mover::{MessageMoverService, MoverConfig};
use crate::discord::{Data, Error};
use crate::infra::localization::load_catalog;
use crate::infra::message_mover::SerenityPlatform;
use poise::serenity_prelude as serenity;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Read an optional, parseable environment variable.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn mover_config_from_env() -> MoverConfig {
    let defaults = MoverConfig::default();
    MoverConfig {
        relay_name: std::env::var("RELAY_NAME").unwrap_or(defaults.relay_name),
        history_cap: env_or("MOVEALL_HISTORY_CAP", defaults.history_cap),
        remote_timeout_secs: env_or("REMOTE_CALL_TIMEOUT_SECS", defaults.remote_timeout_secs),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );
    let prefix = std::env::var("COMMAND_PREFIX").unwrap_or_else(|_| "!".to_string());

    let config = mover_config_from_env();

    let locale_file = std::env::var("LOCALE_FILE").ok().map(PathBuf::from);
    let catalog = Arc::new(
        load_catalog(locale_file.as_deref()).expect("Failed to load the message catalog"),
    );

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::<Data, Error>::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                discord::commands::message_manager::move_message(),
                discord::commands::message_manager::moveall(),
                discord::commands::message_manager::imitate(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(prefix),
                ..Default::default()
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                tracing::info!("Bot is starting up...");

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Commands registered");

                // The platform needs the live HTTP client and cache, so the
                // service is wired here rather than before the client exists.
                let platform = SerenityPlatform::new(
                    ctx.http.clone(),
                    ctx.cache.clone(),
                    Duration::from_secs(config.remote_timeout_secs),
                );
                let mover = Arc::new(MessageMoverService::new(platform, config));
                tracing::info!(
                    relay_name = %mover.config().relay_name,
                    history_cap = mover.config().history_cap,
                    remote_timeout_secs = mover.config().remote_timeout_secs,
                    "Message mover ready"
                );

                Ok(Data { mover, catalog })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
