// Message mover service - orchestrates single and range moves.
//
// Flow for every operation:
//   resolve destination -> authorize -> (collect range) -> acquire relay
//   -> copy each message in order -> release relay -> notify
//
// Resolution and authorization failures stop before anything is touched.
// Once a relay exists it is released no matter how copying went.
//
// NO Discord dependencies here - the platform and notifier are injected.

use super::channel_resolver::resolve_destination;
use super::message_copier::copy_one;
use super::mover_errors::MoveError;
use super::mover_models::{
    ChannelReference, CopyOutcome, MentionSet, MoveContext, MoveReport, MoveStage, MoverConfig,
    OutgoingMessage, Persona, RangePlan, SourceMessage,
};
use super::permission_gate::authorize;
use super::platform::{ChatPlatform, MoveNotifier};
use super::range_collector::{collect_range, MoveRange};
use super::webhook_relay::{relay_display_name, with_relay};

fn enter(operation: &'static str, stage: MoveStage) {
    tracing::debug!(operation, %stage, "Move stage");
}

/// Log the terminal stage of an operation and hand the result back.
fn finish<T>(operation: &'static str, result: Result<T, MoveError>) -> Result<T, MoveError> {
    match &result {
        Ok(_) => enter(operation, MoveStage::Done),
        Err(e) => {
            enter(operation, MoveStage::Failed);
            tracing::debug!(operation, "Move failed: {}", e);
        }
    }
    result
}

pub struct MessageMoverService<P: ChatPlatform> {
    platform: P,
    config: MoverConfig,
}

impl<P: ChatPlatform> MessageMoverService<P> {
    pub fn new(platform: P, config: MoverConfig) -> Self {
        Self { platform, config }
    }

    #[cfg(test)]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> &MoverConfig {
        &self.config
    }

    /// Move one message to `channel`.
    pub async fn move_one(
        &self,
        ctx: &MoveContext,
        message: SourceMessage,
        channel: ChannelReference,
        confirm: bool,
        notifier: &dyn MoveNotifier,
    ) -> Result<MoveReport, MoveError> {
        let result = self
            .run_move_one(ctx, message, channel, confirm, notifier)
            .await;
        finish("move", result)
    }

    async fn run_move_one(
        &self,
        ctx: &MoveContext,
        message: SourceMessage,
        channel: ChannelReference,
        confirm: bool,
        notifier: &dyn MoveNotifier,
    ) -> Result<MoveReport, MoveError> {
        const OP: &str = "move";
        enter(OP, MoveStage::Resolving);
        let destination = resolve_destination(&self.platform, channel).await?;

        enter(OP, MoveStage::Authorizing);
        authorize(&self.platform, ctx, message.channel_id, &destination).await?;

        enter(OP, MoveStage::Relaying);
        let platform = &self.platform;
        let source_channel_id = message.channel_id;
        let thread_id = destination.thread_id();
        let outcome = with_relay(
            platform,
            &destination,
            &self.config.relay_name,
            |handle| async move {
                enter(OP, MoveStage::Copying);
                let outcome = copy_one(platform, &message, &handle, thread_id, 0).await;
                enter(OP, MoveStage::Releasing);
                outcome
            },
        )
        .await?;

        tracing::info!(
            guild_id = ctx.guild_id,
            invoked_in = ctx.source_channel_id,
            source_channel_id,
            destination = %destination.info().name,
            original_id = outcome.original_id(),
            copy_id = outcome.copy_id(),
            "Moved message"
        );

        let report = MoveReport {
            source_channel_id,
            destination,
            outcomes: vec![outcome],
        };

        if confirm {
            enter(OP, MoveStage::Notifying);
            notifier.move_confirmed(&report).await;
        }
        Ok(report)
    }

    /// Move every message from `a` to `b` inclusive, in chronological order.
    ///
    /// The boundaries may be given in either order. One relay serves the whole
    /// range and copies are made strictly one after another.
    pub async fn move_range(
        &self,
        ctx: &MoveContext,
        a: SourceMessage,
        b: SourceMessage,
        channel: ChannelReference,
        confirm: bool,
        notifier: &dyn MoveNotifier,
    ) -> Result<MoveReport, MoveError> {
        let result = self
            .run_move_range(ctx, a, b, channel, confirm, notifier)
            .await;
        finish("moveall", result)
    }

    async fn run_move_range(
        &self,
        ctx: &MoveContext,
        a: SourceMessage,
        b: SourceMessage,
        channel: ChannelReference,
        confirm: bool,
        notifier: &dyn MoveNotifier,
    ) -> Result<MoveReport, MoveError> {
        const OP: &str = "moveall";
        enter(OP, MoveStage::Resolving);
        let destination = resolve_destination(&self.platform, channel).await?;

        enter(OP, MoveStage::Authorizing);
        authorize(&self.platform, ctx, a.channel_id, &destination).await?;

        enter(OP, MoveStage::Collecting);
        let range = MoveRange::new(a, b)?;
        let source_channel_id = range.channel_id();
        let messages = collect_range(&self.platform, range, self.config.history_cap).await?;

        notifier
            .range_started(&RangePlan {
                source_channel_id,
                destination: destination.clone(),
                message_count: messages.len(),
            })
            .await;

        enter(OP, MoveStage::Relaying);
        let platform = &self.platform;
        let messages = &messages;
        let thread_id = destination.thread_id();
        let outcomes = with_relay(
            platform,
            &destination,
            &self.config.relay_name,
            |handle| async move {
                enter(OP, MoveStage::Copying);
                let mut outcomes: Vec<CopyOutcome> = Vec::with_capacity(messages.len());
                for message in messages {
                    match copy_one(platform, message, &handle, thread_id, outcomes.len()).await
                    {
                        Ok(outcome) => outcomes.push(outcome),
                        Err(e) => {
                            enter(OP, MoveStage::Releasing);
                            return Err(e);
                        }
                    }
                }
                enter(OP, MoveStage::Releasing);
                Ok(outcomes)
            },
        )
        .await?;

        let report = MoveReport {
            source_channel_id,
            destination,
            outcomes,
        };

        tracing::info!(
            guild_id = ctx.guild_id,
            invoked_in = ctx.source_channel_id,
            source_channel_id,
            destination = %report.destination.info().name,
            moved = report.moved_count(),
            duplicates = report.duplicates().count(),
            "Moved message range"
        );

        if confirm {
            enter(OP, MoveStage::Notifying);
            notifier.move_confirmed(&report).await;
        }
        Ok(report)
    }

    /// Post `text` in `channel_id` looking like `persona`.
    ///
    /// Returns the id of the posted message. Nothing is deleted here; the
    /// caller removes its own command message.
    pub async fn imitate(
        &self,
        channel_id: u64,
        persona: Persona,
        text: String,
    ) -> Result<u64, MoveError> {
        let result = self.run_imitate(channel_id, persona, text).await;
        finish("imitate", result)
    }

    async fn run_imitate(
        &self,
        channel_id: u64,
        persona: Persona,
        text: String,
    ) -> Result<u64, MoveError> {
        const OP: &str = "imitate";
        enter(OP, MoveStage::Resolving);
        let destination =
            resolve_destination(&self.platform, ChannelReference::ById(channel_id)).await?;

        enter(OP, MoveStage::Relaying);
        let platform = &self.platform;
        let thread_id = destination.thread_id();
        let name = relay_display_name(&persona.display_name);
        let outgoing = OutgoingMessage {
            content: text,
            files: Vec::new(),
            embeds: Vec::new(),
            username: name.clone(),
            avatar_url: persona.avatar_url,
            thread_id,
            allowed_mentions: MentionSet::none(),
        };
        with_relay(platform, &destination, &name, |handle| async move {
            platform
                .relay_send(&handle, outgoing)
                .await
                .map_err(MoveError::from)
        })
        .await
    }
}

// ============================================================================
// TESTS
// ============================================================================
