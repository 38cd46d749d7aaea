//! Display State Machine
//!
//! The idle/session model of the wall as one [`SessionContext`] value,
//! changed only through [`apply`]. Every transition replaces mode, photo,
//! photo source and outfits together, so a partially applied update cannot
//! be observed.
//!
//! | Current | Event                          | Next    |
//! |---------|--------------------------------|---------|
//! | any     | `connected` / `disconnected`   | unchanged |
//! | any     | `keepalive`                    | unchanged |
//! | any     | `idle` / `timeout`             | Idle, photo cleared, outfits regenerated |
//! | any     | `session`                      | Session, photo/source/outfits from payload |
//!
//! Unknown event types never reach the reducer; the channel drops them.

use serde::{Deserialize, Serialize};

use crate::events::ChannelEvent;
use crate::outfit::OutfitSelection;

/// Presentation mode of the wall
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Ambient randomized presentation
    #[default]
    Idle,
    /// Personalized presentation of a captured portrait
    Session,
}

impl Mode {
    /// Lowercase name for status displays
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Session => "session",
        }
    }
}

/// Everything the wall shows, apart from connectivity and asset readiness
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Current mode
    pub mode: Mode,
    /// Captured photo token/URL (session only)
    pub user_photo: Option<String>,
    /// Capture origin tag (session only)
    pub photo_source: Option<String>,
    /// Outfit on display
    pub outfits: OutfitSelection,
}

/// What the head slot shows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadSource<'a> {
    /// The captured photo
    Photo(&'a str),
    /// The constant default animation
    Default,
}

impl SessionContext {
    /// Startup state: idle with an empty selection
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// Apply one event; see [`apply`]
    #[must_use]
    pub fn apply<F>(&self, event: &ChannelEvent, regenerate: F) -> Self
    where
        F: FnOnce() -> OutfitSelection,
    {
        apply(self, event, regenerate)
    }

    /// Replace only the outfits (idle refresh); mode and photo are untouched
    #[must_use]
    pub fn with_outfits(&self, outfits: OutfitSelection) -> Self {
        Self {
            outfits,
            ..self.clone()
        }
    }

    /// Resolve the head slot
    ///
    /// The captured photo is shown only in session mode with a photo present.
    #[must_use]
    pub fn head(&self) -> HeadSource<'_> {
        match (self.mode, self.user_photo.as_deref()) {
            (Mode::Session, Some(photo)) if !photo.trim().is_empty() => HeadSource::Photo(photo),
            _ => HeadSource::Default,
        }
    }

    /// Whether a session is on screen
    #[must_use]
    pub fn is_session(&self) -> bool {
        self.mode == Mode::Session
    }
}

/// Reducer: compute the next context from the current one and an event
///
/// `regenerate` is called only for idle-inducing events (`idle`, `timeout`)
/// and supplies the fresh randomized selection. Session payloads are taken
/// verbatim and replace the previous session wholesale.
pub fn apply<F>(current: &SessionContext, event: &ChannelEvent, regenerate: F) -> SessionContext
where
    F: FnOnce() -> OutfitSelection,
{
    match event {
        ChannelEvent::Connected | ChannelEvent::Disconnected | ChannelEvent::Keepalive { .. } => {
            current.clone()
        }
        ChannelEvent::Idle | ChannelEvent::Timeout => SessionContext {
            mode: Mode::Idle,
            user_photo: None,
            photo_source: None,
            outfits: regenerate(),
        },
        ChannelEvent::Session(payload) => SessionContext {
            mode: Mode::Session,
            user_photo: payload.user_photo.clone(),
            photo_source: payload.photo_source.clone(),
            outfits: payload.outfits.clone().unwrap_or_default(),
        },
    }
}
