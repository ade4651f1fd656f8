// Embed notices posted while messages are moved.
//
// One notifier is built per command invocation. For a range it remembers the
// "running" notice and the introduction so the confirmation can edit the
// former and link to the latter.

use crate::core::localization::MessageCatalog;
use crate::core::message_mover::{MoveNotifier, MoveReport, RangePlan};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tokio::sync::Mutex;

const SINGLE_MOVE_COLOUR: u32 = 0x00C9FF;

pub struct EmbedNotifier {
    http: Arc<serenity::Http>,
    catalog: Arc<MessageCatalog>,
    /// Channel the command was run in.
    invoking_channel: serenity::ChannelId,
    /// Plain name of the member who ran the command, for footers.
    invoker_name: String,
    running: Mutex<Option<serenity::Message>>,
    introduction_link: Mutex<Option<String>>,
}

impl EmbedNotifier {
    pub fn new(
        http: Arc<serenity::Http>,
        catalog: Arc<MessageCatalog>,
        invoking_channel: serenity::ChannelId,
        invoker_name: String,
    ) -> Self {
        Self {
            http,
            catalog,
            invoking_channel,
            invoker_name,
            running: Mutex::new(None),
            introduction_link: Mutex::new(None),
        }
    }

    fn embed(
        &self,
        description: String,
        colour: serenity::Colour,
        footer_key: &str,
    ) -> serenity::CreateEmbed {
        let footer = self
            .catalog
            .render(footer_key, &[("user", &self.invoker_name)]);
        serenity::CreateEmbed::new()
            .description(description)
            .colour(colour)
            .footer(serenity::CreateEmbedFooter::new(footer))
    }

    async fn post(
        &self,
        channel: serenity::ChannelId,
        embed: serenity::CreateEmbed,
    ) -> Option<serenity::Message> {
        match channel
            .send_message(&*self.http, serenity::CreateMessage::new().embed(embed))
            .await
        {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!("Failed to post move notice in {}: {}", channel, e);
                None
            }
        }
    }
}

/// Description of the confirmation for a single moved message.
fn single_confirmation(catalog: &MessageCatalog, report: &MoveReport) -> String {
    let author = report
        .outcomes
        .first()
        .map(|o| format!("<@{}>", o.author_id()))
        .unwrap_or_default();
    catalog.render(
        "message_manager.move.confirm",
        &[
            ("user", &author),
            ("channel", &report.destination.mention()),
        ],
    )
}

#[async_trait]
impl MoveNotifier for EmbedNotifier {
    async fn range_started(&self, plan: &RangePlan) {
        let running = self.embed(
            self.catalog.render(
                "message_manager.moveall.running",
                &[
                    ("channel", &plan.destination.mention()),
                    ("count", &plan.message_count.to_string()),
                ],
            ),
            serenity::Colour::BLUE,
            "message_manager.moveall.footer",
        );
        let Some(running) = self.post(self.invoking_channel, running).await else {
            return;
        };

        let introduce = self.embed(
            self.catalog.render(
                "message_manager.moveall.introduce",
                &[
                    ("channel", &format!("<#{}>", plan.source_channel_id)),
                    ("link", &running.link()),
                ],
            ),
            serenity::Colour::BLUE,
            "message_manager.moveall.footer",
        );
        let destination = serenity::ChannelId::new(plan.destination.id());
        if let Some(introduction) = self.post(destination, introduce).await {
            *self.introduction_link.lock().await = Some(introduction.link());
        }
        *self.running.lock().await = Some(running);
    }

    async fn move_confirmed(&self, report: &MoveReport) {
        if !report.is_range() {
            let embed = self.embed(
                single_confirmation(&self.catalog, report),
                serenity::Colour::new(SINGLE_MOVE_COLOUR),
                "message_manager.move.footer",
            );
            self.post(self.invoking_channel, embed).await;
            return;
        }

        let link = self.introduction_link.lock().await.clone().unwrap_or_default();
        let embed = self.embed(
            self.catalog.render(
                "message_manager.moveall.confirm",
                &[
                    ("channel", &report.destination.mention()),
                    ("link", &link),
                ],
            ),
            serenity::Colour::DARK_GREEN,
            "message_manager.moveall.footer",
        );

        let running = self.running.lock().await.take();
        match running {
            Some(running) => {
                let edit = serenity::EditMessage::new().embed(embed);
                if let Err(e) = running
                    .channel_id
                    .edit_message(&*self.http, running.id, edit)
                    .await
                {
                    tracing::warn!("Failed to edit running notice {}: {}", running.id, e);
                }
            }
            // The running notice never made it out; post the confirmation fresh.
            None => {
                self.post(self.invoking_channel, embed).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message_mover::{ChannelInfo, CopyOutcome, Destination};
    use std::collections::HashMap;

    #[test]
    fn test_single_confirmation_mentions_author_and_destination() {
        let mut templates = HashMap::new();
        templates.insert(
            "message_manager.move.confirm".to_string(),
            "{user} -> {channel}".to_string(),
        );
        let catalog = MessageCatalog::new(templates);
        let report = MoveReport {
            source_channel_id: 10,
            destination: Destination::Channel(ChannelInfo {
                id: 20,
                guild_id: 1,
                name: "general".into(),
            }),
            outcomes: vec![CopyOutcome::Moved {
                original_id: 5,
                author_id: 77,
                copy_id: 900,
            }],
        };

        assert_eq!(single_confirmation(&catalog, &report), "<@77> -> <#20>");
    }
}
