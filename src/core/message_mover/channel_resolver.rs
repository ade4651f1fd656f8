// Turns a channel reference into something messages can be moved to.

use super::mover_errors::MoveError;
use super::mover_models::{ChannelReference, Destination};
use super::platform::ChatPlatform;

/// Strip `<#...>` decoration and parse what is left as a channel id.
pub fn parse_channel_id(raw: &str) -> Option<u64> {
    raw.trim()
        .replace("<#", "")
        .replace('>', "")
        .trim()
        .parse::<u64>()
        .ok()
}

/// Resolve a reference into a concrete destination.
///
/// Fails with `UnresolvableChannel` when the text is not an id or when the
/// platform has no message-capable channel under that id.
pub async fn resolve_destination<P: ChatPlatform + ?Sized>(
    platform: &P,
    reference: ChannelReference,
) -> Result<Destination, MoveError> {
    let (channel_id, raw) = match reference {
        ChannelReference::Resolved(destination) => return Ok(destination),
        ChannelReference::ById(id) => (id, id.to_string()),
        ChannelReference::MentionMarkup(raw) => match parse_channel_id(&raw) {
            Some(id) => (id, raw),
            None => return Err(MoveError::UnresolvableChannel(raw)),
        },
    };

    platform
        .lookup_channel(channel_id)
        .await?
        .ok_or(MoveError::UnresolvableChannel(raw))
}
