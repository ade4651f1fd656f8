// Discord commands for moving messages between channels.
//
// **Notice the pattern:**
// 1. Convert Discord arguments into core types
// 2. Call the mover service
// 3. Turn the result (or error) into a localized notice
//
// This layer is THIN - the mover decides what is allowed and in what order.

use crate::core::localization::MessageCatalog;
use crate::core::message_mover::{
    ChannelReference, MessageMoverService, MoveContext, MoveError, MoveReport, Persona,
};
use crate::discord::notifier::EmbedNotifier;
use crate::infra::message_mover::{destination_from, source_message_from, SerenityPlatform};
use poise::serenity_prelude::{self as serenity, ArgumentConvert};
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

// User data, which is stored and accessible in all command invocations
pub struct Data {
    pub mover: Arc<MessageMoverService<SerenityPlatform>>,
    pub catalog: Arc<MessageCatalog>,
}

/// Move a message to another channel.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    aliases("mv"),
    rename = "move",
    required_permissions = "MANAGE_MESSAGES | VIEW_CHANNEL | READ_MESSAGE_HISTORY"
)]
pub async fn move_message(
    ctx: Context<'_>,
    #[description = "Message ID, channelID-messageID, or message link"] message: String,
    #[description = "Destination channel (mention, ID or name)"] channel: String,
    #[description = "Post a confirmation (default: true)"] confirm: Option<bool>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let Some(message) = fetch_message(ctx, &message).await? else {
        return Ok(());
    };
    let destination = channel_reference(ctx, &channel).await;
    let move_ctx = move_context(ctx)?;
    let notifier = notifier_for(ctx);

    let result = ctx
        .data()
        .mover
        .move_one(
            &move_ctx,
            source_message_from(&message),
            destination,
            confirm.unwrap_or(true),
            &notifier,
        )
        .await;

    conclude(ctx, result).await
}

/// Move every message between two messages (inclusive) to another channel.
///
/// Both messages must be in the same channel; they may be given in any order.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    aliases("mva"),
    required_permissions = "MANAGE_MESSAGES | VIEW_CHANNEL | READ_MESSAGE_HISTORY"
)]
pub async fn moveall(
    ctx: Context<'_>,
    #[description = "First message (ID, channelID-messageID, or link)"] first: String,
    #[description = "Last message (ID, channelID-messageID, or link)"] last: String,
    #[description = "Destination channel (mention, ID or name)"] channel: String,
    #[description = "Post a confirmation (default: true)"] confirm: Option<bool>,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let Some(first) = fetch_message(ctx, &first).await? else {
        return Ok(());
    };
    let Some(last) = fetch_message(ctx, &last).await? else {
        return Ok(());
    };
    let destination = channel_reference(ctx, &channel).await;
    let move_ctx = move_context(ctx)?;
    let notifier = notifier_for(ctx);

    let result = ctx
        .data()
        .mover
        .move_range(
            &move_ctx,
            source_message_from(&first),
            source_message_from(&last),
            destination,
            confirm.unwrap_or(true),
            &notifier,
        )
        .await;

    conclude(ctx, result).await
}

/// Say something here as if another member had said it.
#[poise::command(
    prefix_command,
    slash_command,
    guild_only,
    required_permissions = "MANAGE_MESSAGES | MANAGE_NICKNAMES"
)]
pub async fn imitate(
    ctx: Context<'_>,
    #[description = "Member to imitate"] member: serenity::Member,
    #[description = "What they should say"]
    #[rest]
    text: String,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let persona = Persona {
        display_name: member.display_name().to_string(),
        avatar_url: Some(member.face()),
    };

    match ctx
        .data()
        .mover
        .imitate(ctx.channel_id().get(), persona, text)
        .await
    {
        Ok(_) => {
            discard_invocation(ctx).await;
            Ok(())
        }
        Err(e) => send_failure(ctx, &e).await,
    }
}

/// Resolve a message argument, telling the user when it cannot be found.
async fn fetch_message(ctx: Context<'_>, raw: &str) -> Result<Option<serenity::Message>, Error> {
    match serenity::Message::convert(
        ctx.serenity_context(),
        ctx.guild_id(),
        Some(ctx.channel_id()),
        raw.trim(),
    )
    .await
    {
        Ok(message) => Ok(Some(message)),
        Err(e) => {
            tracing::debug!("Could not resolve message argument {:?}: {}", raw, e);
            let text = ctx.data().catalog.render("message_manager.no-message", &[]);
            ctx.send(poise::CreateReply::default().content(text)).await?;
            Ok(None)
        }
    }
}

/// Let serenity resolve mentions, ids and names first; anything it cannot
/// place is handed to the mover as raw text.
async fn channel_reference(ctx: Context<'_>, raw: &str) -> ChannelReference {
    let converted = serenity::GuildChannel::convert(
        ctx.serenity_context(),
        ctx.guild_id(),
        Some(ctx.channel_id()),
        raw.trim(),
    )
    .await;

    match converted.ok().as_ref().and_then(destination_from) {
        Some(destination) => ChannelReference::Resolved(destination),
        None => ChannelReference::parse(raw),
    }
}

fn move_context(ctx: Context<'_>) -> Result<MoveContext, Error> {
    let guild_id = ctx.guild_id().ok_or("This command only works in servers")?;
    let guild_name = ctx
        .guild()
        .map(|guild| guild.name.clone())
        .unwrap_or_else(|| guild_id.to_string());

    Ok(MoveContext {
        guild_id: guild_id.get(),
        guild_name,
        agent_id: ctx.cache().current_user().id.get(),
        invoker_id: ctx.author().id.get(),
        source_channel_id: ctx.channel_id().get(),
    })
}

fn notifier_for(ctx: Context<'_>) -> EmbedNotifier {
    EmbedNotifier::new(
        ctx.serenity_context().http.clone(),
        Arc::clone(&ctx.data().catalog),
        ctx.channel_id(),
        ctx.author().name.clone(),
    )
}

/// Finish a move: drop the command message on success, explain on failure.
async fn conclude(ctx: Context<'_>, result: Result<MoveReport, MoveError>) -> Result<(), Error> {
    let report = match result {
        Ok(report) => report,
        Err(e) => return send_failure(ctx, &e).await,
    };

    discard_invocation(ctx).await;

    if let Some(error) = leftover_duplicates(&report) {
        send_failure(ctx, &error).await?;
    }
    Ok(())
}

/// Originals that were copied but could not be deleted, as an error to report.
fn leftover_duplicates(report: &MoveReport) -> Option<MoveError> {
    let mut duplicates = report.duplicates();
    let first = duplicates.next()?;
    Some(MoveError::DeleteFailure {
        message_id: first.original_id(),
        count: 1 + duplicates.count(),
    })
}

/// Text of the notice explaining `error`.
fn failure_notice(catalog: &MessageCatalog, error: &MoveError) -> String {
    let key = error.notice_key();
    match error {
        MoveError::CopyFailure { moved, .. } => {
            catalog.render(key, &[("moved", &moved.to_string())])
        }
        MoveError::DeleteFailure { count, .. } => {
            catalog.render(key, &[("count", &count.to_string())])
        }
        _ => catalog.render(key, &[]),
    }
}

async fn send_failure(ctx: Context<'_>, error: &MoveError) -> Result<(), Error> {
    let text = failure_notice(&ctx.data().catalog, error);

    let reply = match error {
        MoveError::UserPermissionDenied => poise::CreateReply::default().embed(
            serenity::CreateEmbed::new()
                .description(text)
                .colour(serenity::Colour::RED),
        ),
        _ => poise::CreateReply::default().content(text),
    };

    ctx.send(reply).await?;
    Ok(())
}

/// Delete the prefix command message, or acknowledge a slash invocation.
async fn discard_invocation(ctx: Context<'_>) {
    match ctx {
        poise::Context::Prefix(prefix) => {
            if let Err(e) = prefix.msg.delete(ctx.http()).await {
                tracing::warn!("Failed to delete command message {}: {}", prefix.msg.id, e);
            }
        }
        poise::Context::Application(_) => {
            let text = ctx.data().catalog.render("message_manager.done", &[]);
            if let Err(e) = ctx
                .send(poise::CreateReply::default().content(text).ephemeral(true))
                .await
            {
                tracing::warn!("Failed to acknowledge command: {}", e);
            }
        }
    }
}
