// In-memory chat platform used by the mover tests.
//
// Records every remote call so tests can assert on ordering, cleanup and
// mention notifications without talking to a real server.

use super::mover_errors::PlatformError;
use super::mover_models::{
    AttachmentRef, Capabilities, ChannelInfo, Destination, FilePayload, MentionSet,
    MoveContext, MoveReport, OutgoingMessage, RangePlan, RelayEdit, RelayHandle, SourceMessage,
};
use super::platform::{ChatPlatform, MoveNotifier};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

pub const GUILD: u64 = 1;
pub const SOURCE: u64 = 10;
pub const DEST: u64 = 20;
pub const THREAD: u64 = 21;
pub const OTHER: u64 = 30;
pub const AGENT: u64 = 500;
pub const INVOKER: u64 = 600;

/// One message that went out through a relay.
#[derive(Debug, Clone)]
pub struct SentCopy {
    pub relay_id: u64,
    pub relay_channel_id: u64,
    pub copy_id: u64,
    pub message: OutgoingMessage,
}

pub struct MockPlatform {
    channels: DashMap<u64, Destination>,
    capabilities: DashMap<(u64, u64), Capabilities>,
    messages: Mutex<Vec<SourceMessage>>,
    live_relays: DashMap<u64, RelayHandle>,
    sent: Mutex<Vec<SentCopy>>,
    edits: Mutex<Vec<(u64, RelayEdit)>>,
    failing_deletes: DashSet<u64>,
    fail_send_at: Mutex<Option<usize>>,
    fail_relay_creation: Mutex<bool>,
    fail_edits: Mutex<bool>,
    next_id: AtomicU64,
    pub relays_created: AtomicUsize,
    pub relays_deleted: AtomicUsize,
    pub send_attempts: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub notifications: AtomicUsize,
}

impl MockPlatform {
    /// Guild with a source channel, a destination channel with one thread and
    /// an unrelated channel. Agent and invoker hold every permission.
    pub fn new() -> Self {
        let platform = Self {
            channels: DashMap::new(),
            capabilities: DashMap::new(),
            messages: Mutex::new(Vec::new()),
            live_relays: DashMap::new(),
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            failing_deletes: DashSet::new(),
            fail_send_at: Mutex::new(None),
            fail_relay_creation: Mutex::new(false),
            fail_edits: Mutex::new(false),
            next_id: AtomicU64::new(10_000),
            relays_created: AtomicUsize::new(0),
            relays_deleted: AtomicUsize::new(0),
            send_attempts: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
            notifications: AtomicUsize::new(0),
        };

        for (id, name) in [(SOURCE, "source"), (DEST, "dest"), (OTHER, "other")] {
            platform.channels.insert(
                id,
                Destination::Channel(ChannelInfo {
                    id,
                    guild_id: GUILD,
                    name: name.to_string(),
                }),
            );
        }
        platform.channels.insert(
            THREAD,
            Destination::Thread {
                info: ChannelInfo {
                    id: THREAD,
                    guild_id: GUILD,
                    name: "dest-thread".to_string(),
                },
                parent_id: DEST,
            },
        );

        let all = Capabilities {
            view_channel: true,
            read_message_history: true,
            manage_messages: true,
        };
        for channel in [SOURCE, DEST, THREAD, OTHER] {
            for user in [AGENT, INVOKER] {
                platform.capabilities.insert((channel, user), all);
            }
        }

        platform
    }

    pub fn set_capabilities(&self, channel_id: u64, user_id: u64, caps: Capabilities) {
        self.capabilities.insert((channel_id, user_id), caps);
    }

    pub fn remove_member(&self, channel_id: u64, user_id: u64) {
        self.capabilities.remove(&(channel_id, user_id));
    }

    /// Store a message in `channel_id`; `seq` drives both id and timestamp.
    pub fn add_message(&self, channel_id: u64, seq: u64, content: &str) -> SourceMessage {
        let message = message(channel_id, seq, content);
        self.messages
            .lock()
            .expect("messages lock")
            .push(message.clone());
        message
    }

    pub fn fail_send_at(&self, attempt: usize) {
        *self.fail_send_at.lock().expect("fail lock") = Some(attempt);
    }

    pub fn fail_delete_of(&self, message_id: u64) {
        self.failing_deletes.insert(message_id);
    }

    pub fn fail_edits(&self) {
        *self.fail_edits.lock().expect("fail lock") = true;
    }

    pub fn fail_relay_creation(&self) {
        *self.fail_relay_creation.lock().expect("fail lock") = true;
    }

    pub fn remaining_ids(&self, channel_id: u64) -> Vec<u64> {
        self.messages
            .lock()
            .expect("messages lock")
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .map(|m| m.id)
            .collect()
    }

    pub fn sent(&self) -> Vec<SentCopy> {
        self.sent.lock().expect("sent lock").clone()
    }

    pub fn sent_contents(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|s| s.message.content)
            .collect()
    }

    pub fn edits(&self) -> Vec<(u64, RelayEdit)> {
        self.edits.lock().expect("edits lock").clone()
    }

    pub fn live_relay_count(&self) -> usize {
        self.live_relays.len()
    }
}

/// Build a standalone message snapshot; `seq` seconds after a fixed epoch.
pub fn message(channel_id: u64, seq: u64, content: &str) -> SourceMessage {
    SourceMessage {
        id: seq,
        channel_id,
        author_id: 700 + seq,
        author_display_name: format!("author-{}", seq),
        author_avatar_url: Some(format!("https://cdn.example/{}.png", seq)),
        content: content.to_string(),
        attachments: Vec::new(),
        embeds: Vec::new(),
        mentions: MentionSet::none(),
        created_at: Utc
            .timestamp_opt(1_700_000_000 + seq as i64, 0)
            .single()
            .expect("valid timestamp"),
    }
}

pub fn context() -> MoveContext {
    MoveContext {
        guild_id: GUILD,
        guild_name: "Test Guild".to_string(),
        agent_id: AGENT,
        invoker_id: INVOKER,
        source_channel_id: SOURCE,
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn lookup_channel(&self, channel_id: u64) -> Result<Option<Destination>, PlatformError> {
        Ok(self.channels.get(&channel_id).map(|c| c.clone()))
    }

    async fn capabilities(
        &self,
        channel_id: u64,
        user_id: u64,
    ) -> Result<Option<Capabilities>, PlatformError> {
        Ok(self.capabilities.get(&(channel_id, user_id)).map(|c| *c))
    }

    async fn history_between(
        &self,
        channel_id: u64,
        after_id: u64,
        before_id: u64,
        limit: usize,
    ) -> Result<Vec<SourceMessage>, PlatformError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let mut found: Vec<SourceMessage> = self
            .messages
            .lock()
            .expect("messages lock")
            .iter()
            .filter(|m| m.channel_id == channel_id && m.id > after_id && m.id < before_id)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.id);
        found.truncate(limit);
        // Newest first, like the platform's default page order.
        found.reverse();
        Ok(found)
    }

    async fn download_attachment(
        &self,
        attachment: &AttachmentRef,
    ) -> Result<FilePayload, PlatformError> {
        Ok(FilePayload {
            filename: attachment.filename.clone(),
            data: attachment.url.as_bytes().to_vec(),
        })
    }

    async fn create_relay(&self, channel_id: u64, _name: &str) -> Result<RelayHandle, PlatformError> {
        if *self.fail_relay_creation.lock().expect("fail lock") {
            return Err(PlatformError::Api("Maximum number of webhooks reached".into()));
        }
        if matches!(
            self.channels.get(&channel_id).map(|c| c.clone()),
            Some(Destination::Thread { .. })
        ) {
            return Err(PlatformError::Api("Threads cannot own webhooks".into()));
        }
        self.relays_created.fetch_add(1, Ordering::SeqCst);
        let handle = RelayHandle {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            channel_id,
        };
        self.live_relays.insert(handle.id, handle.clone());
        Ok(handle)
    }

    async fn relay_send(
        &self,
        handle: &RelayHandle,
        message: OutgoingMessage,
    ) -> Result<u64, PlatformError> {
        let attempt = self.send_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.live_relays.contains_key(&handle.id) {
            return Err(PlatformError::NotFound);
        }
        if *self.fail_send_at.lock().expect("fail lock") == Some(attempt) {
            return Err(PlatformError::Api("Internal Server Error".into()));
        }

        let allowed = &message.allowed_mentions;
        let pings = allowed.users.len() + allowed.roles.len() + usize::from(allowed.everyone);
        self.notifications.fetch_add(pings, Ordering::SeqCst);

        let copy_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().expect("sent lock").push(SentCopy {
            relay_id: handle.id,
            relay_channel_id: handle.channel_id,
            copy_id,
            message,
        });
        Ok(copy_id)
    }

    async fn relay_edit(
        &self,
        handle: &RelayHandle,
        message_id: u64,
        edit: RelayEdit,
    ) -> Result<(), PlatformError> {
        if !self.live_relays.contains_key(&handle.id) {
            return Err(PlatformError::NotFound);
        }
        if *self.fail_edits.lock().expect("fail lock") {
            return Err(PlatformError::Api("Unknown Webhook".into()));
        }
        // Edits re-render mentions but never deliver notifications.
        self.edits.lock().expect("edits lock").push((message_id, edit));
        Ok(())
    }

    async fn delete_relay(&self, handle: &RelayHandle) -> Result<(), PlatformError> {
        self.relays_deleted.fetch_add(1, Ordering::SeqCst);
        self.live_relays
            .remove(&handle.id)
            .map(|_| ())
            .ok_or(PlatformError::NotFound)
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.contains(&message_id) {
            return Err(PlatformError::Api("Missing Access".into()));
        }
        let mut messages = self.messages.lock().expect("messages lock");
        let before = messages.len();
        messages.retain(|m| !(m.channel_id == channel_id && m.id == message_id));
        if messages.len() == before {
            return Err(PlatformError::NotFound);
        }
        Ok(())
    }
}

/// Notifier that stays silent.
pub struct SilentNotifier;

#[async_trait]
impl MoveNotifier for SilentNotifier {
    async fn range_started(&self, _plan: &RangePlan) {}

    async fn move_confirmed(&self, _report: &MoveReport) {}
}
