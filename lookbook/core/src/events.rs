//! Channel Events
//!
//! Events delivered by the backend over the real-time channel, plus the
//! connectivity events the channel manager synthesizes itself.
//!
//! # Wire Format
//!
//! Each frame is one JSON object:
//!
//! ```json
//! { "type": "session", "data": { "userPhotoToken": "X", "photoSource": "booth", "outfits": { "top": "a.png" } } }
//! ```
//!
//! `type` is one of `connected`, `idle`, `session`, `timeout`, `keepalive`.
//! Older backends send the photo as `userPhoto` and the capture origin as
//! `source`; both spellings are accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::outfit::OutfitSelection;

/// Events consumed by the display state machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Channel handshake completed (or the backend greeted us)
    Connected,
    /// Backend says the wall is idle
    Idle,
    /// A capture started a personalized session
    Session(SessionPayload),
    /// The current session expired
    Timeout,
    /// Liveness ping; carries no state
    Keepalive {
        /// Backend timestamp, when it sent a parseable one
        timestamp: Option<DateTime<Utc>>,
    },
    /// Transport lost; synthesized by the channel manager, never on the wire
    Disconnected,
}

impl ChannelEvent {
    /// Short name for logging
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Idle => "idle",
            Self::Session(_) => "session",
            Self::Timeout => "timeout",
            Self::Keepalive { .. } => "keepalive",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Payload of a `session` event
///
/// Every field is optional. A session without outfits shows an empty
/// selection; a session without a photo shows the default head.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SessionWire")]
pub struct SessionPayload {
    /// Opaque token or URL of the captured photo
    #[serde(rename = "userPhotoToken")]
    pub user_photo: Option<String>,
    /// Tag distinguishing where the photo came from (booth, manual upload, ...)
    pub photo_source: Option<String>,
    /// Detected outfit for the session
    pub outfits: Option<OutfitSelection>,
}

/// Session payload as sent, with current and legacy spellings kept apart
///
/// A backend in the middle of a migration may send both; the current
/// spelling wins.
#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SessionWire {
    user_photo_token: Option<String>,
    user_photo: Option<String>,
    photo_source: Option<String>,
    source: Option<String>,
    outfits: Option<OutfitSelection>,
}

impl From<SessionWire> for SessionPayload {
    fn from(wire: SessionWire) -> Self {
        Self {
            user_photo: wire.user_photo_token.or(wire.user_photo),
            photo_source: wire.photo_source.or(wire.source),
            outfits: wire.outfits,
        }
    }
}

/// Why a frame was dropped
#[derive(Debug, Error)]
pub enum EventParseError {
    /// Frame is not a JSON object with a `type` field
    #[error("invalid frame: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// `type` is not one the display understands
    #[error("unknown event type: {0}")]
    UnknownType(String),

    /// Known `type` but the `data` does not have the expected shape
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        /// Event type whose payload failed
        kind: &'static str,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct WireFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    timestamp: Option<Value>,
}

/// Parse one wire frame
///
/// # Errors
///
/// Returns an [`EventParseError`] for malformed JSON, unknown event types and
/// session payloads of the wrong shape. Callers log and drop these.
pub fn parse_frame(text: &str) -> Result<ChannelEvent, EventParseError> {
    let frame: WireFrame = serde_json::from_str(text).map_err(EventParseError::InvalidJson)?;

    match frame.kind.as_str() {
        "connected" => Ok(ChannelEvent::Connected),
        "idle" => Ok(ChannelEvent::Idle),
        "timeout" => Ok(ChannelEvent::Timeout),
        "keepalive" => {
            let timestamp = frame
                .timestamp
                .as_ref()
                .or_else(|| frame.data.as_ref().and_then(|d| d.get("timestamp")))
                .and_then(parse_timestamp);
            Ok(ChannelEvent::Keepalive { timestamp })
        }
        "session" => {
            let payload = match frame.data {
                None | Some(Value::Null) => SessionPayload::default(),
                Some(data) => serde_json::from_value(data).map_err(|source| {
                    EventParseError::InvalidPayload {
                        kind: "session",
                        source,
                    }
                })?,
            };
            Ok(ChannelEvent::Session(payload))
        }
        other => Err(EventParseError::UnknownType(other.to_string())),
    }
}

/// Accept RFC 3339 strings or epoch milliseconds
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
