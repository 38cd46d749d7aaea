//! Lookbook Core - Headless Session Synchronization for the Lookbook Wall
//!
//! This crate drives an unattended display wall that alternates between an
//! idle "ambient" presentation (randomized outfits refreshed on a cadence)
//! and a short-lived personalized session triggered by a photo capture
//! upstream. It is completely independent of any rendering surface: the
//! terminal surface in `lookbook-display` only draws the [`ViewModel`] it
//! receives.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Backend of record                         │
//! │        GET /outfits (manifest)          /events (SSE or WS)       │
//! └───────────────┬─────────────────────────────────┬────────────────┘
//!                 │                                 │
//! ┌───────────────┼─────────────────────────────────┼────────────────┐
//! │  LOOKBOOK CORE│                                 │                 │
//! │  ┌────────────┴─────────┐          ┌────────────┴─────────────┐  │
//! │  │     AssetLoader      │          │      ChannelManager      │  │
//! │  │ manifest + probes    │          │ connect / retry / parse  │  │
//! │  └────────────┬─────────┘          └────────────┬─────────────┘  │
//! │               │ AssetsLoaded                    │ ChannelEvent   │
//! │  ┌────────────┴─────────────────────────────────┴─────────────┐  │
//! │  │                       DisplayEngine                         │  │
//! │  │  SessionContext reducer  ·  IdleRefreshScheduler  ·  view   │  │
//! │  └────────────────────────────┬───────────────────────────────┘  │
//! └───────────────────────────────┼──────────────────────────────────┘
//!                                 │ watch<ViewModel>
//!                          rendering surface
//! ```
//!
//! # Module Overview
//!
//! - [`assets`]: manifest fetch, all-settled asset probing, the [`AssetIndex`]
//! - [`channel`]: real-time channel lifecycle and its transports
//! - [`state`]: the idle/session reducer and head-slot resolution
//! - [`refresh`]: the cancellable idle refresh timer
//! - [`outfit`]: slots, genders and randomized outfit generation
//! - [`engine`]: the single event-dispatch path that ties it all together
//! - [`events`]: wire frames from the backend
//! - [`config`]: layered configuration (defaults, TOML, environment, CLI)

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assets;
pub mod auth;
pub mod channel;
pub mod config;
pub mod engine;
pub mod events;
pub mod outfit;
pub mod refresh;
pub mod state;

// Re-exports for convenience
pub use assets::{
    AssetCache, AssetError, AssetIndex, AssetLoader, AssetProbe, FixedAsset, FixedAssetNames,
    HttpProbe, LoadReport, LoadedAssets, Manifest, ProbeError,
};
pub use auth::ApiKey;
pub use channel::{
    create_transport_factory, ChannelConfig, ChannelHandle, ChannelManager, ConnectionId,
    Connectivity, EventTransport, InProcessTransport, SseTransport, TransportError,
    TransportFactory, TransportType,
};
pub use config::{
    default_config_path, load_config, load_config_from_path, BackendConfig, ConfigError,
    ConfigOverrides, ConfigSource, DisplayConfig, LookbookConfig, LookbookToml,
};
pub use engine::{DisplayEngine, EngineConfig, EngineInput, Flow, HeadView, LoadPhase, SlotView, ViewModel};
pub use events::{parse_frame, ChannelEvent, EventParseError, SessionPayload};
pub use outfit::{random_outfit, random_outfit_for, Gender, OutfitSelection, Slot};
pub use refresh::IdleRefreshScheduler;
pub use state::{apply, HeadSource, Mode, SessionContext};
