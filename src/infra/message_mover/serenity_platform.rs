// Serenity-backed implementation of the mover's `ChatPlatform` port.
//
// Every remote call goes through `bounded`, which caps it with the configured
// timeout so an unresponsive request cannot hang a move forever.

use crate::core::message_mover::{
    AttachmentRef, Capabilities, ChannelInfo, ChatPlatform, Destination, FilePayload, MentionSet,
    OutgoingMessage, PlatformError, RelayEdit, RelayHandle, SourceMessage,
};
use ::serenity::Error as SerenityError;
use async_trait::async_trait;
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Page size the history endpoint accepts at most.
const HISTORY_PAGE: usize = 100;

pub struct SerenityPlatform {
    http: Arc<serenity::Http>,
    cache: Arc<serenity::Cache>,
    timeout: Duration,
    // Relay id -> live webhook (carries the token needed to execute it)
    relays: DashMap<u64, serenity::Webhook>,
}

impl SerenityPlatform {
    pub fn new(
        http: Arc<serenity::Http>,
        cache: Arc<serenity::Cache>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            cache,
            timeout,
            relays: DashMap::new(),
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, PlatformError>
    where
        F: Future<Output = Result<T, SerenityError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(platform_error(e)),
            Err(_) => Err(PlatformError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Guild channel by id: cache first, then HTTP.
    async fn guild_channel(
        &self,
        channel_id: u64,
    ) -> Result<Option<serenity::GuildChannel>, PlatformError> {
        if channel_id == 0 {
            return Ok(None);
        }
        let id = serenity::ChannelId::new(channel_id);

        if let Some(cached) = self.cached_channel(id) {
            return Ok(Some(cached));
        }

        match self.bounded(id.to_channel(&*self.http)).await {
            Ok(serenity::Channel::Guild(channel)) => Ok(Some(channel)),
            Ok(_) => Ok(None),
            Err(PlatformError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Channel or thread from whichever cached guild holds it.
    fn cached_channel(&self, id: serenity::ChannelId) -> Option<serenity::GuildChannel> {
        self.cache.guilds().into_iter().find_map(|guild_id| {
            let guild = self.cache.guild(guild_id)?;
            find_channel(&guild.channels, &guild.threads, id)
        })
    }

    fn relay(&self, handle: &RelayHandle) -> Result<serenity::Webhook, PlatformError> {
        self.relays
            .get(&handle.id)
            .map(|w| w.clone())
            .ok_or(PlatformError::NotFound)
    }
}

fn find_channel(
    channels: &HashMap<serenity::ChannelId, serenity::GuildChannel>,
    threads: &[serenity::GuildChannel],
    id: serenity::ChannelId,
) -> Option<serenity::GuildChannel> {
    channels
        .get(&id)
        .or_else(|| threads.iter().find(|thread| thread.id == id))
        .cloned()
}

fn platform_error(error: SerenityError) -> PlatformError {
    if let SerenityError::Http(::serenity::http::HttpError::UnsuccessfulRequest(response)) = &error
    {
        // 403 means we cannot see it, which for lookups is the same as absent.
        if matches!(response.status_code.as_u16(), 403 | 404) {
            return PlatformError::NotFound;
        }
    }
    PlatformError::Api(error.to_string())
}

/// Map a guild channel to a move destination, if messages can be posted there.
pub fn destination_from(channel: &serenity::GuildChannel) -> Option<Destination> {
    let info = ChannelInfo {
        id: channel.id.get(),
        guild_id: channel.guild_id.get(),
        name: channel.name.clone(),
    };

    match channel.kind {
        serenity::ChannelType::Text | serenity::ChannelType::News => {
            Some(Destination::Channel(info))
        }
        serenity::ChannelType::PublicThread
        | serenity::ChannelType::PrivateThread
        | serenity::ChannelType::NewsThread => channel.parent_id.map(|parent| Destination::Thread {
            info,
            parent_id: parent.get(),
        }),
        _ => None,
    }
}

/// Walk history forward from `after_id` one page at a time, oldest first,
/// until `before_id` is reached, `limit` items are taken or history runs out.
///
/// `page(cursor, size)` returns `(id, item)` pairs newer than `cursor`, in
/// any order.
async fn walk_history<T, F, Fut>(
    after_id: u64,
    before_id: u64,
    limit: usize,
    mut page: F,
) -> Result<Vec<T>, PlatformError>
where
    F: FnMut(u64, u8) -> Fut,
    Fut: Future<Output = Result<Vec<(u64, T)>, PlatformError>>,
{
    let mut cursor = after_id;
    let mut collected = Vec::new();

    while collected.len() < limit {
        let remaining = limit - collected.len();
        let size = remaining.min(HISTORY_PAGE) as u8;
        let (taken, next) = take_until(page(cursor, size).await?, before_id, remaining);
        collected.extend(taken);
        match next {
            Some(next) => cursor = next,
            None => break,
        }
    }
    Ok(collected)
}

/// Take items from one page, oldest first, stopping at `before_id` or after
/// `remaining` items. Returns them with the cursor for the next page, or
/// `None` when the walk is over.
fn take_until<T>(
    mut page: Vec<(u64, T)>,
    before_id: u64,
    remaining: usize,
) -> (Vec<T>, Option<u64>) {
    page.sort_by_key(|(id, _)| *id);
    let Some(&(last_id, _)) = page.last() else {
        return (Vec::new(), None);
    };

    let mut taken = Vec::new();
    for (id, item) in page {
        if id >= before_id || taken.len() >= remaining {
            return (taken, None);
        }
        taken.push(item);
    }

    let next = (taken.len() < remaining).then_some(last_id);
    (taken, next)
}

fn capabilities_from(permissions: serenity::Permissions) -> Capabilities {
    Capabilities {
        view_channel: permissions.view_channel(),
        read_message_history: permissions.read_message_history(),
        manage_messages: permissions.manage_messages(),
    }
}

fn allowed_mentions(set: &MentionSet) -> serenity::CreateAllowedMentions {
    serenity::CreateAllowedMentions::new()
        .everyone(set.everyone)
        .users(set.users.iter().map(|id| serenity::UserId::new(*id)))
        .roles(set.roles.iter().map(|id| serenity::RoleId::new(*id)))
}

/// Snapshot a serenity message into the mover's platform-agnostic form.
pub fn source_message_from(message: &serenity::Message) -> SourceMessage {
    SourceMessage {
        id: message.id.get(),
        channel_id: message.channel_id.get(),
        author_id: message.author.id.get(),
        author_display_name: message.author.display_name().to_string(),
        author_avatar_url: Some(message.author.face()),
        content: message.content.clone(),
        attachments: message
            .attachments
            .iter()
            .map(|a| AttachmentRef {
                id: a.id.get(),
                filename: a.filename.clone(),
                url: a.url.clone(),
            })
            .collect(),
        embeds: message
            .embeds
            .iter()
            .filter_map(|e| serde_json::to_value(e).ok())
            .collect(),
        mentions: MentionSet {
            users: message.mentions.iter().map(|u| u.id.get()).collect(),
            roles: message.mention_roles.iter().map(|r| r.get()).collect(),
            everyone: message.mention_everyone,
        },
        created_at: *message.timestamp,
    }
}

#[async_trait]
impl ChatPlatform for SerenityPlatform {
    async fn lookup_channel(&self, channel_id: u64) -> Result<Option<Destination>, PlatformError> {
        Ok(self
            .guild_channel(channel_id)
            .await?
            .as_ref()
            .and_then(destination_from))
    }

    async fn capabilities(
        &self,
        channel_id: u64,
        user_id: u64,
    ) -> Result<Option<Capabilities>, PlatformError> {
        let Some(mut channel) = self.guild_channel(channel_id).await? else {
            return Ok(None);
        };

        // Threads inherit their parent's overwrites.
        if channel.thread_metadata.is_some() {
            if let Some(parent_id) = channel.parent_id {
                match self.guild_channel(parent_id.get()).await? {
                    Some(parent) => channel = parent,
                    None => return Ok(None),
                }
            }
        }

        let guild_id = channel.guild_id;
        let member = match self
            .bounded(guild_id.member(&*self.http, serenity::UserId::new(user_id)))
            .await
        {
            Ok(member) => member,
            Err(PlatformError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        // Compute from the cached guild without holding the ref across an await.
        let cached = self
            .cache
            .guild(guild_id)
            .map(|guild| guild.user_permissions_in(&channel, &member));
        let permissions = match cached {
            Some(permissions) => permissions,
            None => {
                let guild = self
                    .bounded(guild_id.to_partial_guild(&*self.http))
                    .await?;
                guild.user_permissions_in(&channel, &member)
            }
        };

        Ok(Some(capabilities_from(permissions)))
    }

    async fn history_between(
        &self,
        channel_id: u64,
        after_id: u64,
        before_id: u64,
        limit: usize,
    ) -> Result<Vec<SourceMessage>, PlatformError> {
        let channel = serenity::ChannelId::new(channel_id);
        let page = move |cursor: u64, size: u8| async move {
            let messages = self
                .bounded(channel.messages(
                    &*self.http,
                    serenity::GetMessages::new()
                        .after(serenity::MessageId::new(cursor))
                        .limit(size),
                ))
                .await?;
            Ok::<_, PlatformError>(
                messages
                    .into_iter()
                    .map(|m| (m.id.get(), source_message_from(&m)))
                    .collect::<Vec<_>>(),
            )
        };
        let collected = walk_history(after_id, before_id, limit, page).await?;

        tracing::debug!(
            channel_id,
            after_id,
            before_id,
            collected = collected.len(),
            "Fetched history between boundaries"
        );
        Ok(collected)
    }

    async fn download_attachment(
        &self,
        attachment: &AttachmentRef,
    ) -> Result<FilePayload, PlatformError> {
        let file = self
            .bounded(serenity::CreateAttachment::url(&*self.http, &attachment.url))
            .await?;
        Ok(FilePayload {
            filename: attachment.filename.clone(),
            data: file.data,
        })
    }

    async fn create_relay(&self, channel_id: u64, name: &str) -> Result<RelayHandle, PlatformError> {
        let webhook = self
            .bounded(
                serenity::ChannelId::new(channel_id)
                    .create_webhook(&*self.http, serenity::CreateWebhook::new(name)),
            )
            .await?;

        let handle = RelayHandle {
            id: webhook.id.get(),
            channel_id,
        };
        self.relays.insert(handle.id, webhook);
        Ok(handle)
    }

    async fn relay_send(
        &self,
        handle: &RelayHandle,
        message: OutgoingMessage,
    ) -> Result<u64, PlatformError> {
        let webhook = self.relay(handle)?;

        let embeds: Vec<serenity::CreateEmbed> = message
            .embeds
            .into_iter()
            .filter_map(|value| serde_json::from_value::<serenity::Embed>(value).ok())
            .map(serenity::CreateEmbed::from)
            .collect();
        let files = message
            .files
            .into_iter()
            .map(|f| serenity::CreateAttachment::bytes(f.data, f.filename));

        let mut builder = serenity::ExecuteWebhook::new()
            .username(message.username)
            .embeds(embeds)
            .add_files(files)
            .allowed_mentions(allowed_mentions(&message.allowed_mentions));
        if !message.content.is_empty() {
            builder = builder.content(message.content);
        }
        if let Some(avatar_url) = message.avatar_url {
            builder = builder.avatar_url(avatar_url);
        }
        if let Some(thread_id) = message.thread_id {
            builder = builder.in_thread(serenity::ChannelId::new(thread_id));
        }

        let sent = self
            .bounded(webhook.execute(&*self.http, true, builder))
            .await?;
        sent.map(|m| m.id.get())
            .ok_or_else(|| PlatformError::Api("Webhook did not return the sent message".into()))
    }

    async fn relay_edit(
        &self,
        handle: &RelayHandle,
        message_id: u64,
        edit: RelayEdit,
    ) -> Result<(), PlatformError> {
        let webhook = self.relay(handle)?;

        let mut builder = serenity::EditWebhookMessage::new()
            .content(edit.content)
            .allowed_mentions(allowed_mentions(&edit.allowed_mentions));
        if let Some(thread_id) = edit.thread_id {
            builder = builder.in_thread(serenity::ChannelId::new(thread_id));
        }

        self.bounded(webhook.edit_message(
            &*self.http,
            serenity::MessageId::new(message_id),
            builder,
        ))
        .await?;
        Ok(())
    }

    async fn delete_relay(&self, handle: &RelayHandle) -> Result<(), PlatformError> {
        let (_, webhook) = self
            .relays
            .remove(&handle.id)
            .ok_or(PlatformError::NotFound)?;
        self.bounded(webhook.delete(&*self.http)).await
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), PlatformError> {
        self.bounded(
            serenity::ChannelId::new(channel_id)
                .delete_message(&*self.http, serenity::MessageId::new(message_id)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Requests = Arc<Mutex<Vec<(u64, u8)>>>;

    /// History of `ids`, served newest first like the real endpoint. Every
    /// `(cursor, size)` request is recorded.
    fn serve(
        ids: Vec<u64>,
        requests: Requests,
    ) -> impl FnMut(u64, u8) -> std::future::Ready<Result<Vec<(u64, u64)>, PlatformError>> {
        move |cursor, size| {
            requests.lock().unwrap().push((cursor, size));
            let mut page: Vec<(u64, u64)> = ids
                .iter()
                .filter(|id| **id > cursor)
                .take(size as usize)
                .map(|id| (*id, *id))
                .collect();
            page.reverse();
            std::future::ready(Ok(page))
        }
    }

    #[tokio::test]
    async fn history_walks_several_pages_in_order() {
        let ids: Vec<u64> = (1..=250).collect();
        let requests = Requests::default();

        let collected = walk_history(0, 1_000, 500, serve(ids.clone(), requests.clone()))
            .await
            .unwrap();

        assert_eq!(collected, ids);
        assert_eq!(
            *requests.lock().unwrap(),
            vec![(0, 100), (100, 100), (200, 100), (250, 100)]
        );
    }

    #[tokio::test]
    async fn history_stops_at_the_second_boundary() {
        let requests = Requests::default();

        let collected = walk_history(10, 42, 200, serve((1..=150).collect(), requests.clone()))
            .await
            .unwrap();

        assert_eq!(collected, (11..42).collect::<Vec<u64>>());
        assert_eq!(*requests.lock().unwrap(), vec![(10, 100)]);
    }

    #[tokio::test]
    async fn history_limit_shrinks_the_last_page() {
        let requests = Requests::default();

        let collected = walk_history(0, 1_000, 130, serve((1..=300).collect(), requests.clone()))
            .await
            .unwrap();

        assert_eq!(collected.len(), 130);
        assert_eq!(collected.last(), Some(&130));
        assert_eq!(*requests.lock().unwrap(), vec![(0, 100), (100, 30)]);
    }

    #[test]
    fn take_until_honours_the_limit_mid_page() {
        let page = vec![(9, 'c'), (7, 'a'), (8, 'b')];
        assert_eq!(take_until(page.clone(), 100, 2), (vec!['a', 'b'], None));
        assert_eq!(take_until(page, 100, 5), (vec!['a', 'b', 'c'], Some(9)));
        assert_eq!(take_until(Vec::<(u64, char)>::new(), 100, 5), (vec![], None));
    }

    fn channel(id: u64, kind: serenity::ChannelType) -> serenity::GuildChannel {
        let mut channel = serenity::GuildChannel::default();
        channel.id = serenity::ChannelId::new(id);
        channel.kind = kind;
        channel
    }

    #[test]
    fn cached_lookup_covers_channels_and_threads() {
        let mut channels = HashMap::new();
        channels.insert(
            serenity::ChannelId::new(20),
            channel(20, serenity::ChannelType::Text),
        );
        let threads = vec![channel(21, serenity::ChannelType::PublicThread)];

        let found = |id| find_channel(&channels, &threads, serenity::ChannelId::new(id));
        assert_eq!(found(20).map(|c| c.kind), Some(serenity::ChannelType::Text));
        assert_eq!(
            found(21).map(|c| c.kind),
            Some(serenity::ChannelType::PublicThread)
        );
        assert!(found(99).is_none());
    }

    #[test]
    fn test_capabilities_from_permissions() {
        let caps = capabilities_from(
            serenity::Permissions::VIEW_CHANNEL | serenity::Permissions::MANAGE_MESSAGES,
        );
        assert!(caps.view_channel);
        assert!(caps.manage_messages);
        assert!(!caps.read_message_history);
        assert!(!caps.can_read_and_prune());
    }

    #[test]
    fn no_permissions_means_no_capabilities() {
        let caps = capabilities_from(serenity::Permissions::empty());
        assert_eq!(caps, Capabilities::default());
    }

    #[test]
    fn suppressed_mentions_allow_nothing() {
        let value = serde_json::to_value(allowed_mentions(&MentionSet::none())).unwrap();
        assert_eq!(value["parse"], serde_json::json!([]));
    }

    #[test]
    fn original_mentions_are_listed_explicitly() {
        let set = MentionSet {
            users: vec![5, 6],
            roles: vec![9],
            everyone: true,
        };
        let value = serde_json::to_value(allowed_mentions(&set)).unwrap();
        assert_eq!(value["parse"], serde_json::json!(["everyone"]));
        assert_eq!(value["users"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["roles"].as_array().map(Vec::len), Some(1));
    }
}
