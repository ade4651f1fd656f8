// Builds the ordered list of messages for a range move.

use super::mover_errors::MoveError;
use super::mover_models::SourceMessage;
use super::platform::ChatPlatform;

/// Two validated boundaries: same channel, `first` not after `second`.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveRange {
    first: SourceMessage,
    second: SourceMessage,
}

impl MoveRange {
    /// Validate two boundaries, swapping them if given newest first.
    ///
    /// Timestamps can tie, so the id (which grows with time) breaks the tie.
    pub fn new(a: SourceMessage, b: SourceMessage) -> Result<Self, MoveError> {
        if a.id == b.id {
            return Err(MoveError::MessageIdentityConflict);
        }
        if a.channel_id != b.channel_id {
            return Err(MoveError::ChannelMismatch);
        }

        let (first, second) = if (a.created_at, a.id) > (b.created_at, b.id) {
            (b, a)
        } else {
            (a, b)
        };
        Ok(Self { first, second })
    }

    pub fn channel_id(&self) -> u64 {
        self.first.channel_id
    }
}

/// Collect `first`, everything strictly between, then `second`, oldest first.
///
/// At most `cap` messages are taken from between the boundaries, so the
/// result holds between 2 and `cap + 2` messages. Nothing is modified.
pub async fn collect_range<P: ChatPlatform + ?Sized>(
    platform: &P,
    range: MoveRange,
    cap: usize,
) -> Result<Vec<SourceMessage>, MoveError> {
    let MoveRange { first, second } = range;

    let mut between = platform
        .history_between(first.channel_id, first.id, second.id, cap)
        .await?;
    between.retain(|m| {
        m.channel_id == first.channel_id
            && m.id != first.id
            && m.id != second.id
            && m.created_at >= first.created_at
            && m.created_at <= second.created_at
    });
    between.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    between.truncate(cap);

    let mut ordered = Vec::with_capacity(between.len() + 2);
    ordered.push(first);
    ordered.extend(between);
    ordered.push(second);
    Ok(ordered)
}
