// Permission gate: checked before anything is copied or deleted, so a
// failure here never needs cleanup.

use super::mover_errors::MoveError;
use super::mover_models::{Destination, MoveContext};
use super::platform::ChatPlatform;

/// Verify the bot and the invoking member may move messages from
/// `source_channel_id` into `destination`.
///
/// The bot needs view, read-history and manage-messages on the source and
/// manage-messages on the destination. The member needs the same on the
/// source, so a message link cannot reach into a channel they cannot see,
/// and manage-messages on the destination as seen in the destination's guild.
pub async fn authorize<P: ChatPlatform + ?Sized>(
    platform: &P,
    ctx: &MoveContext,
    source_channel_id: u64,
    destination: &Destination,
) -> Result<(), MoveError> {
    let agent_source = platform
        .capabilities(source_channel_id, ctx.agent_id)
        .await?
        .unwrap_or_default();
    let agent_destination = platform
        .capabilities(destination.id(), ctx.agent_id)
        .await?
        .unwrap_or_default();

    if !(agent_source.can_read_and_prune() && agent_destination.manage_messages) {
        tracing::info!(
            guild_id = ctx.guild_id,
            source_channel_id,
            destination_id = destination.id(),
            destination_guild_id = destination.guild_id(),
            "move: Missing permissions on guild \"{}\"",
            ctx.guild_name
        );
        return Err(MoveError::AgentPermissionDenied {
            guild: ctx.guild_name.clone(),
        });
    }

    let invoker_source = platform
        .capabilities(source_channel_id, ctx.invoker_id)
        .await?
        .unwrap_or_default();
    let invoker_destination = platform
        .capabilities(destination.id(), ctx.invoker_id)
        .await?;
    match invoker_destination {
        Some(caps) if caps.manage_messages && invoker_source.can_read_and_prune() => Ok(()),
        _ => {
            tracing::debug!(
                invoker_id = ctx.invoker_id,
                source_channel_id,
                destination_id = destination.id(),
                "move: Invoker lacks permissions"
            );
            Err(MoveError::UserPermissionDenied)
        }
    }
}
