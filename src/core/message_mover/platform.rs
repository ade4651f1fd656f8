// Ports the mover talks through.
//
// `ChatPlatform` is the remote chat API (fetch, webhooks, deletes) and
// `MoveNotifier` is whoever tells users what happened. Neither knows about
// serenity; the infra and discord layers provide the implementations.

use super::mover_errors::PlatformError;
use super::mover_models::{
    AttachmentRef, Capabilities, Destination, FilePayload, MoveReport, OutgoingMessage,
    RangePlan, RelayEdit, RelayHandle, SourceMessage,
};
use async_trait::async_trait;

/// Remote chat platform operations used by the mover.
///
/// Every method is one remote call attempted once; nothing here retries.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Look up a channel or thread by id.
    ///
    /// Returns `None` when the id is unknown or names something that cannot
    /// receive messages (voice, category, forum, DM).
    async fn lookup_channel(&self, channel_id: u64) -> Result<Option<Destination>, PlatformError>;

    /// Effective permissions of `user_id` in `channel_id`.
    ///
    /// Returns `None` when the user is not a member of the channel's guild.
    async fn capabilities(
        &self,
        channel_id: u64,
        user_id: u64,
    ) -> Result<Option<Capabilities>, PlatformError>;

    /// Messages strictly between `after_id` and `before_id`, at most `limit`.
    async fn history_between(
        &self,
        channel_id: u64,
        after_id: u64,
        before_id: u64,
        limit: usize,
    ) -> Result<Vec<SourceMessage>, PlatformError>;

    async fn download_attachment(
        &self,
        attachment: &AttachmentRef,
    ) -> Result<FilePayload, PlatformError>;

    async fn create_relay(&self, channel_id: u64, name: &str) -> Result<RelayHandle, PlatformError>;

    /// Send through a relay, returning the new message id.
    async fn relay_send(
        &self,
        handle: &RelayHandle,
        message: OutgoingMessage,
    ) -> Result<u64, PlatformError>;

    async fn relay_edit(
        &self,
        handle: &RelayHandle,
        message_id: u64,
        edit: RelayEdit,
    ) -> Result<(), PlatformError>;

    async fn delete_relay(&self, handle: &RelayHandle) -> Result<(), PlatformError>;

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError>;
}

/// Progress and confirmation reporting for moves.
///
/// Implementations swallow their own failures; a notice that cannot be
/// posted must never fail a move that already happened.
#[async_trait]
pub trait MoveNotifier: Send + Sync {
    /// A range has been collected and is about to be copied.
    async fn range_started(&self, plan: &RangePlan);

    /// The move finished and the caller asked for a confirmation.
    async fn move_confirmed(&self, report: &MoveReport);
}
