// Error taxonomy for the message mover.
//
// Every variant is recovered at the command boundary and turned into exactly
// one localized notice, so each one knows its catalog key.

use thiserror::Error;

/// Failure reported by the remote chat platform.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlatformError {
    #[error("Not found")]
    NotFound,

    #[error("Remote call timed out after {0}s")]
    Timeout(u64),

    #[error("Platform API error: {0}")]
    Api(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum MoveError {
    #[error("`{0}` is not a channel messages can be moved to")]
    UnresolvableChannel(String),

    #[error("Bot is missing permissions on guild \"{guild}\"")]
    AgentPermissionDenied { guild: String },

    #[error("You need Manage Messages in the destination channel")]
    UserPermissionDenied,

    #[error("Both boundaries are the same message")]
    MessageIdentityConflict,

    #[error("Boundaries are not in the same channel")]
    ChannelMismatch,

    #[error("Could not create a relay: {0}")]
    RelayUnavailable(PlatformError),

    #[error("Copying message {message_id} failed after {moved} moved: {reason}")]
    CopyFailure {
        message_id: u64,
        moved: usize,
        reason: PlatformError,
    },

    #[error("{count} original message(s) could not be deleted, first was {message_id}")]
    DeleteFailure { message_id: u64, count: usize },

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

impl MoveError {
    /// Localization key of the user-facing notice for this error.
    pub fn notice_key(&self) -> &'static str {
        match self {
            MoveError::UnresolvableChannel(_) => "message_manager.no-channel",
            MoveError::AgentPermissionDenied { .. } => "message_manager.moveall.missing-perm",
            MoveError::UserPermissionDenied => "message_manager.permission",
            MoveError::MessageIdentityConflict => "message_manager.moveall.same-message",
            MoveError::ChannelMismatch => "message_manager.moveall.channel-conflict",
            MoveError::RelayUnavailable(_) => "message_manager.relay-failed",
            MoveError::CopyFailure { .. } => "message_manager.copy-failed",
            MoveError::DeleteFailure { .. } => "message_manager.delete-failed",
            MoveError::Platform(_) => "message_manager.platform-error",
        }
    }
}
