// Copies one message through a relay handle and removes the original.
//
// The copy is sent with every notification suppressed. If the original
// mentioned anyone, the copy is then edited with the original mention set so
// it renders the same highlighting; edits never deliver pings. The original
// is only deleted once the copy exists.

use super::mover_errors::{MoveError, PlatformError};
use super::mover_models::{
    CopyOutcome, MentionSet, OutgoingMessage, Persona, RelayEdit, RelayHandle, SourceMessage,
};
use super::platform::ChatPlatform;
use super::webhook_relay::relay_display_name;

/// Copy `message` to the relay's channel (or `thread_id` under it), then
/// delete the original.
///
/// `moved_so_far` only feeds the error report for range moves.
///
/// A failed attachment download, send or mention edit leaves the original
/// untouched and returns `CopyFailure`. A failed delete after a successful
/// copy is not an error: it comes back as `CopyOutcome::DeleteFailed`.
pub async fn copy_one<P: ChatPlatform + ?Sized>(
    platform: &P,
    message: &SourceMessage,
    handle: &RelayHandle,
    thread_id: Option<u64>,
    moved_so_far: usize,
) -> Result<CopyOutcome, MoveError> {
    let fail = |reason: PlatformError| MoveError::CopyFailure {
        message_id: message.id,
        moved: moved_so_far,
        reason,
    };

    // 1. Attachments as re-uploadable files
    let mut files = Vec::with_capacity(message.attachments.len());
    for attachment in &message.attachments {
        let file = platform
            .download_attachment(attachment)
            .await
            .map_err(|e| {
                tracing::debug!(attachment_id = attachment.id, "Attachment download failed");
                fail(e)
            })?;
        files.push(file);
    }

    // 2-3. Send with no pings, impersonating the author
    let persona = Persona::of(message);
    let outgoing = OutgoingMessage {
        content: message.content.clone(),
        files,
        embeds: message.embeds.clone(),
        username: relay_display_name(&persona.display_name),
        avatar_url: persona.avatar_url,
        thread_id,
        allowed_mentions: MentionSet::none(),
    };
    let copy_id = platform.relay_send(handle, outgoing).await.map_err(fail)?;

    // 4. Restore mention rendering without notifying
    if !message.mentions.is_empty() {
        let edit = RelayEdit {
            content: message.content.clone(),
            thread_id,
            allowed_mentions: message.mentions.clone(),
        };
        platform
            .relay_edit(handle, copy_id, edit)
            .await
            .map_err(fail)?;
    }

    // 5. Only now remove the original
    match platform
        .delete_message(message.channel_id, message.id)
        .await
    {
        Ok(()) => Ok(CopyOutcome::Moved {
            original_id: message.id,
            author_id: message.author_id,
            copy_id,
        }),
        Err(e) => {
            tracing::warn!(
                message_id = message.id,
                copy_id,
                "Copied message but could not delete the original: {}",
                e
            );
            Ok(CopyOutcome::DeleteFailed {
                original_id: message.id,
                author_id: message.author_id,
                copy_id,
                reason: e.to_string(),
            })
        }
    }
}
