// Message mover domain models.
//
// Pure data types shared by the resolver, gate, relay, copier and collector.
// Everything is transient: built for one move/moveall invocation and dropped
// afterwards. Ids are the platform's raw snowflakes as u64.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Maximum length the platform accepts for a webhook username.
pub const MAX_RELAY_NAME_LEN: usize = 80;

// ============================================================================
// CHANNELS
// ============================================================================

/// What the caller typed (or the framework already resolved) for a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelReference {
    /// Already a concrete destination, nothing to look up.
    Resolved(Destination),
    /// A bare numeric id.
    ById(u64),
    /// Raw text such as `<#1234>` that still has to be stripped and parsed.
    MentionMarkup(String),
}

impl ChannelReference {
    /// Classify raw command text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u64>() {
            Ok(id) => ChannelReference::ById(id),
            Err(_) => ChannelReference::MentionMarkup(trimmed.to_string()),
        }
    }
}

/// Basic addressing info for a guild text channel or thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelInfo {
    pub id: u64,
    pub guild_id: u64,
    pub name: String,
}

/// A channel or thread capable of receiving relocated messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// Can own webhooks directly.
    Channel(ChannelInfo),
    /// Cannot own webhooks; messages go through the parent's webhook.
    Thread { info: ChannelInfo, parent_id: u64 },
}

impl Destination {
    pub fn id(&self) -> u64 {
        self.info().id
    }

    pub fn guild_id(&self) -> u64 {
        self.info().guild_id
    }

    pub fn info(&self) -> &ChannelInfo {
        match self {
            Destination::Channel(info) => info,
            Destination::Thread { info, .. } => info,
        }
    }

    /// The channel a relay handle has to be bound to.
    pub fn relay_channel_id(&self) -> u64 {
        match self {
            Destination::Channel(info) => info.id,
            Destination::Thread { parent_id, .. } => *parent_id,
        }
    }

    /// Thread to target when sending through the parent's relay.
    pub fn thread_id(&self) -> Option<u64> {
        match self {
            Destination::Channel(_) => None,
            Destination::Thread { info, .. } => Some(info.id),
        }
    }

    pub fn mention(&self) -> String {
        format!("<#{}>", self.id())
    }
}

// ============================================================================
// PERMISSIONS
// ============================================================================

/// The subset of channel permissions the engine cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub view_channel: bool,
    pub read_message_history: bool,
    pub manage_messages: bool,
}

impl Capabilities {
    /// Enough to read originals and delete them afterwards.
    pub fn can_read_and_prune(&self) -> bool {
        self.view_channel && self.read_message_history && self.manage_messages
    }
}

// ============================================================================
// MESSAGES
// ============================================================================

/// Reference to a file attached to a source message.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentRef {
    pub id: u64,
    pub filename: String,
    pub url: String,
}

/// Downloaded attachment ready to be re-uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePayload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Who gets pinged (or highlighted) by a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionSet {
    pub users: Vec<u64>,
    pub roles: Vec<u64>,
    pub everyone: bool,
}

impl MentionSet {
    /// Allows nothing: no user, role or everyone ping fires.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.roles.is_empty() && !self.everyone
    }
}

/// Immutable snapshot of a message to be moved.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMessage {
    pub id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_display_name: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    pub attachments: Vec<AttachmentRef>,
    /// Platform embed objects, passed through untouched.
    pub embeds: Vec<Value>,
    pub mentions: MentionSet,
    pub created_at: DateTime<Utc>,
}

/// What gets sent through a relay handle.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub content: String,
    pub files: Vec<FilePayload>,
    pub embeds: Vec<Value>,
    pub username: String,
    pub avatar_url: Option<String>,
    pub thread_id: Option<u64>,
    /// Mentions the platform is allowed to notify for this send.
    pub allowed_mentions: MentionSet,
}

/// An edit applied to a message previously sent through a relay handle.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayEdit {
    pub content: String,
    pub thread_id: Option<u64>,
    pub allowed_mentions: MentionSet,
}

/// Disposable impersonation endpoint bound to exactly one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayHandle {
    pub id: u64,
    pub channel_id: u64,
}

/// Person to impersonate when posting through a relay.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl Persona {
    pub fn of(message: &SourceMessage) -> Self {
        Self {
            display_name: message.author_display_name.clone(),
            avatar_url: message.author_avatar_url.clone(),
        }
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Result of copying one message.
#[derive(Debug, Clone, PartialEq)]
pub enum CopyOutcome {
    /// Copy posted and original deleted.
    Moved {
        original_id: u64,
        author_id: u64,
        copy_id: u64,
    },
    /// Copy posted but the original could not be deleted: both now exist.
    DeleteFailed {
        original_id: u64,
        author_id: u64,
        copy_id: u64,
        reason: String,
    },
}

impl CopyOutcome {
    pub fn original_id(&self) -> u64 {
        match self {
            CopyOutcome::Moved { original_id, .. } => *original_id,
            CopyOutcome::DeleteFailed { original_id, .. } => *original_id,
        }
    }

    pub fn author_id(&self) -> u64 {
        match self {
            CopyOutcome::Moved { author_id, .. } => *author_id,
            CopyOutcome::DeleteFailed { author_id, .. } => *author_id,
        }
    }

    pub fn copy_id(&self) -> u64 {
        match self {
            CopyOutcome::Moved { copy_id, .. } => *copy_id,
            CopyOutcome::DeleteFailed { copy_id, .. } => *copy_id,
        }
    }
}

/// Handed to the notifier once a range has been collected.
#[derive(Debug, Clone, PartialEq)]
pub struct RangePlan {
    pub source_channel_id: u64,
    pub destination: Destination,
    pub message_count: usize,
}

/// Summary of a finished move or range move.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    pub source_channel_id: u64,
    pub destination: Destination,
    pub outcomes: Vec<CopyOutcome>,
}

impl MoveReport {
    pub fn moved_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_range(&self) -> bool {
        self.outcomes.len() > 1
    }

    /// Copies whose original is still sitting in the source channel.
    pub fn duplicates(&self) -> impl Iterator<Item = &CopyOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CopyOutcome::DeleteFailed { .. }))
    }
}

/// Where an operation currently is. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStage {
    Resolving,
    Authorizing,
    Collecting,
    Relaying,
    Copying,
    Releasing,
    Notifying,
    Done,
    Failed,
}

impl std::fmt::Display for MoveStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MoveStage::Resolving => "resolving",
            MoveStage::Authorizing => "authorizing",
            MoveStage::Collecting => "collecting",
            MoveStage::Relaying => "relaying",
            MoveStage::Copying => "copying",
            MoveStage::Releasing => "releasing",
            MoveStage::Notifying => "notifying",
            MoveStage::Done => "done",
            MoveStage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Tunables for the mover, read from the environment in `main`.
#[derive(Debug, Clone)]
pub struct MoverConfig {
    /// Display name given to relay webhooks created for moves.
    pub relay_name: String,
    /// Upper bound on messages collected between two range boundaries.
    pub history_cap: usize,
    /// Per remote call timeout, in seconds.
    pub remote_timeout_secs: u64,
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            relay_name: "Mover Hook".to_string(),
            history_cap: 200,
            remote_timeout_secs: 15,
        }
    }
}

/// Explicit invocation context, replacing any framework-global state.
#[derive(Debug, Clone)]
pub struct MoveContext {
    pub guild_id: u64,
    pub guild_name: String,
    /// The bot's own user id.
    pub agent_id: u64,
    /// The member who ran the command.
    pub invoker_id: u64,
    /// Channel the command was run in.
    pub source_channel_id: u64,
}
