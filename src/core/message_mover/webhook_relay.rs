// Scoped relay handles.
//
// A relay is created for one operation and deleted when that operation ends,
// whatever the outcome. Handles are never pooled or shared between calls.

use super::mover_errors::MoveError;
use super::mover_models::{Destination, RelayHandle, MAX_RELAY_NAME_LEN};
use super::platform::ChatPlatform;
use std::future::Future;

/// Words the platform refuses anywhere in a webhook username, any case.
const RESERVED_NAME_WORDS: [&str; 2] = ["discord", "clyde"];

/// Clamp a display name to what the platform accepts for webhook usernames.
pub fn relay_display_name(name: &str) -> String {
    let cleaned = strip_reserved_words(name);
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return "Unknown".to_string();
    }
    trimmed.chars().take(MAX_RELAY_NAME_LEN).collect()
}

fn strip_reserved_words(name: &str) -> String {
    let mut name = name.to_string();
    // Removing one word can join the halves into another, so repeat.
    loop {
        // ASCII lowering keeps byte offsets aligned with `name`.
        let lower = name.to_ascii_lowercase();
        let hit = RESERVED_NAME_WORDS
            .iter()
            .find_map(|word| lower.find(word).map(|at| at..at + word.len()));
        match hit {
            Some(range) => name.replace_range(range, ""),
            None => return name,
        }
    }
}

/// Create a relay for `destination`; threads get one on their parent channel.
pub async fn acquire<P: ChatPlatform + ?Sized>(
    platform: &P,
    destination: &Destination,
    name: &str,
) -> Result<RelayHandle, MoveError> {
    let channel_id = destination.relay_channel_id();
    let handle = platform
        .create_relay(channel_id, &relay_display_name(name))
        .await
        .map_err(MoveError::RelayUnavailable)?;
    tracing::debug!(relay_id = handle.id, channel_id, "Relay acquired");
    Ok(handle)
}

/// Destroy a relay. Failures are logged; the caller's outcome stands.
pub async fn release<P: ChatPlatform + ?Sized>(platform: &P, handle: &RelayHandle) {
    match platform.delete_relay(handle).await {
        Ok(()) => tracing::debug!(relay_id = handle.id, "Relay released"),
        Err(e) => tracing::warn!(
            relay_id = handle.id,
            channel_id = handle.channel_id,
            "Failed to delete relay webhook: {}",
            e
        ),
    }
}

/// Run `work` with a fresh relay and release it on every exit path.
///
/// If acquisition fails `work` never runs. Once acquired, the relay is
/// released exactly once whether `work` succeeds or fails.
pub async fn with_relay<P, F, Fut, T>(
    platform: &P,
    destination: &Destination,
    name: &str,
    work: F,
) -> Result<T, MoveError>
where
    P: ChatPlatform + ?Sized,
    F: FnOnce(RelayHandle) -> Fut,
    Fut: Future<Output = Result<T, MoveError>>,
{
    let handle = acquire(platform, destination, name).await?;
    let result = work(handle.clone()).await;
    release(platform, &handle).await;
    result
}
