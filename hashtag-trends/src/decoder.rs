//! Turns raw feed payloads into [`Event`]s.
//!
//! Only `entities.hashtags[].text` is required for a payload to decode. The author and
//! mention screen names are optional here: an event without hashtags is discarded
//! before they are ever looked at, and the extractor deals with them being absent.
use serde::Deserialize;

use crate::error::DecodeError;
use crate::types::Event;

#[derive(Debug, Deserialize)]
struct TweetPayload {
    entities: EntitiesPayload,
    user: Option<ScreenNamePayload>,
}

#[derive(Debug, Deserialize)]
struct EntitiesPayload {
    hashtags: Vec<HashtagPayload>,
    user_mentions: Option<Vec<ScreenNamePayload>>,
}

#[derive(Debug, Deserialize)]
struct HashtagPayload {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ScreenNamePayload {
    screen_name: Option<String>,
}

impl From<TweetPayload> for Event {
    fn from(payload: TweetPayload) -> Self {
        let hashtags = payload
            .entities
            .hashtags
            .into_iter()
            .map(|hashtag| format!("#{}", hashtag.text))
            .collect();

        // A single mention without a screen name makes the whole list unusable
        let mentions = payload.entities.user_mentions.and_then(|mentions| {
            mentions
                .into_iter()
                .map(|mention| mention.screen_name.map(|name| format!("@{name}")))
                .collect::<Option<Vec<_>>>()
        });

        Event {
            author: payload.user.and_then(|user| user.screen_name),
            mentions,
            hashtags,
        }
    }
}

/// Decode a raw payload. Never panics, whatever the bytes.
pub fn decode(raw: &[u8]) -> Result<Event, DecodeError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::Empty);
    }

    let payload: TweetPayload = serde_json::from_slice(raw)?;
    Ok(payload.into())
}
