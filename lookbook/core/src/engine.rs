//! Display Engine
//!
//! The single event-dispatch path of the display. Everything that changes
//! what the wall shows arrives here as an [`EngineInput`] and is applied in
//! arrival order:
//!
//! - channel events go through the [`state`](crate::state) reducer
//! - asset-load completion publishes the index and the manifest default
//! - refresh ticks replace the idle outfits
//! - authorization discards the index and reloads it; a plain reload keeps
//!   the published index until the new one is ready
//!
//! After every input the engine re-evaluates the idle refresh (running iff
//! mode is Idle and assets are Ready) and publishes a [`ViewModel`] on a
//! `watch` channel. Nothing else mutates the [`SessionContext`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::assets::{AssetError, AssetIndex, AssetLoader, FixedAsset, FixedAssetNames, LoadedAssets};
use crate::auth::ApiKey;
use crate::channel::Connectivity;
use crate::config::LookbookConfig;
use crate::events::ChannelEvent;
use crate::outfit::{random_outfit, OutfitSelection, Slot};
use crate::refresh::IdleRefreshScheduler;
use crate::state::{HeadSource, Mode, SessionContext};

/// Everything the engine reacts to
#[derive(Debug)]
pub enum EngineInput {
    /// Event from the channel manager
    Channel(ChannelEvent),
    /// An asset load finished
    AssetsLoaded {
        /// Load generation the result belongs to
        generation: u64,
        /// Loaded assets, or the manifest failure
        result: Result<LoadedAssets, AssetError>,
    },
    /// Idle refresh tick with a freshly generated selection
    Refresh {
        /// Scheduler epoch the tick was produced under
        epoch: u64,
        /// Generated selection
        outfits: OutfitSelection,
    },
    /// New credential: discard the index and load again
    Authorize(ApiKey),
    /// Load again with the current credential
    Reload,
    /// Stop the engine
    Shutdown,
}

/// Whether the dispatch loop continues
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep going
    Continue,
    /// Exit the loop
    Stop,
}

/// Asset readiness
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    /// Manifest or probes still in flight
    Loading,
    /// Index published
    Ready,
    /// Manifest could not be loaded; the wall shows what it can
    Failed(String),
}

/// Head slot as rendered
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeadView {
    /// Captured portrait
    Photo(String),
    /// Default animation URL
    Default(String),
}

/// A resolved outfit slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotView {
    /// Asset filename
    pub filename: String,
    /// URL to load it from
    pub url: String,
}

/// Render-ready snapshot of the display
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewModel {
    /// Asset readiness; nothing is drawn while `Loading`
    pub phase: LoadPhase,
    /// Idle or session
    pub mode: Mode,
    /// Channel status for the operator
    pub connectivity: Connectivity,
    /// Head slot
    pub head: HeadView,
    /// Outfit slots in grid order
    pub slots: Vec<(Slot, Option<SlotView>)>,
    /// Left logo URL
    pub logo_left: String,
    /// Right logo URL
    pub logo_right: String,
    /// Capture origin of the current session
    pub photo_source: Option<String>,
}

impl ViewModel {
    /// Whether the surface should draw the grid
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        self.phase != LoadPhase::Loading
    }

    /// Resolved view of one slot
    #[must_use]
    pub fn slot(&self, slot: Slot) -> Option<&SlotView> {
        self.slots
            .iter()
            .find(|(s, _)| *s == slot)
            .and_then(|(_, view)| view.as_ref())
    }
}

/// Engine settings
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Idle refresh cadence
    pub refresh_interval: Duration,
    /// Base URL for assets, used for fallbacks before and after loading
    pub asset_base: String,
    /// Filenames of the logos and default head
    pub fixed_assets: FixedAssetNames,
    /// Capacity of the input queue
    pub inbox_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(10),
            asset_base: "http://localhost:3001/public/outfits".to_string(),
            fixed_assets: FixedAssetNames::default(),
            inbox_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Derive engine settings from the loaded configuration
    #[must_use]
    pub fn from_config(config: &LookbookConfig) -> Self {
        Self {
            refresh_interval: config.display.refresh_interval(),
            asset_base: config.backend.asset_base_url(),
            fixed_assets: config.display.fixed_assets(),
            ..Self::default()
        }
    }
}

/// Owner of the session context, asset index and idle refresh
pub struct DisplayEngine {
    config: EngineConfig,
    context: SessionContext,
    connectivity: Connectivity,
    index: Arc<AssetIndex>,
    phase: LoadPhase,
    load_generation: u64,
    load_task: Option<JoinHandle<()>>,
    refresh: IdleRefreshScheduler,
    loader: Option<AssetLoader>,
    inbox_tx: mpsc::Sender<EngineInput>,
    inbox_rx: mpsc::Receiver<EngineInput>,
    view_tx: watch::Sender<ViewModel>,
}

impl DisplayEngine {
    /// Create an engine in Idle/Loading with an empty index
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::channel(config.inbox_capacity.max(1));
        let index = Arc::new(AssetIndex::new(config.asset_base.clone()));
        let mut engine = Self {
            context: SessionContext::idle(),
            connectivity: Connectivity::Connecting,
            index,
            phase: LoadPhase::Loading,
            load_generation: 0,
            load_task: None,
            refresh: IdleRefreshScheduler::new(),
            loader: None,
            inbox_tx,
            inbox_rx,
            view_tx: watch::Sender::new(placeholder_view()),
            config,
        };
        let view = engine.view();
        engine.view_tx.send_replace(view);
        engine
    }

    /// Attach the loader used for the initial load and every reload
    #[must_use]
    pub fn with_loader(mut self, loader: AssetLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Sender for inputs from outside the loop
    #[must_use]
    pub fn inbox(&self) -> mpsc::Sender<EngineInput> {
        self.inbox_tx.clone()
    }

    /// Subscribe to view updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ViewModel> {
        self.view_tx.subscribe()
    }

    /// Kick off the initial asset load
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(&mut self) {
        self.begin_loading();
        self.publish();
    }

    /// Apply one input synchronously
    ///
    /// Must be called inside a tokio runtime: starting the idle refresh and
    /// reloads spawn tasks.
    pub fn handle_input(&mut self, input: EngineInput) -> Flow {
        match input {
            EngineInput::Channel(event) => self.on_channel_event(&event),
            EngineInput::AssetsLoaded { generation, result } => {
                self.on_assets_loaded(generation, result);
            }
            EngineInput::Refresh { epoch, outfits } => self.on_refresh(epoch, outfits),
            EngineInput::Authorize(key) => self.authorize(key),
            EngineInput::Reload => {
                info!("Reloading assets");
                self.begin_loading();
            }
            EngineInput::Shutdown => {
                self.refresh.stop();
                if let Some(task) = self.load_task.take() {
                    task.abort();
                }
                info!("Display engine shutting down");
                return Flow::Stop;
            }
        }

        self.sync_refresh();
        self.publish();
        Flow::Continue
    }

    /// Dispatch loop: channel events and queued inputs until shutdown
    pub async fn run(mut self, mut channel: mpsc::Receiver<ChannelEvent>) {
        if self.load_generation == 0 {
            self.start();
        }
        let mut channel_open = true;

        loop {
            let input = tokio::select! {
                Some(input) = self.inbox_rx.recv() => input,
                event = channel.recv(), if channel_open => match event {
                    Some(event) => EngineInput::Channel(event),
                    None => {
                        debug!("Channel event stream closed");
                        channel_open = false;
                        continue;
                    }
                },
                else => break,
            };

            if self.handle_input(input) == Flow::Stop {
                break;
            }
        }

        info!("Display engine stopped");
    }

    /// Current render snapshot
    #[must_use]
    pub fn view(&self) -> ViewModel {
        let index = &self.index;
        let fixed_url = |asset: FixedAsset| {
            index.fixed(asset).map_or_else(
                || index.fallback_url(self.config.fixed_assets.filename(asset)),
                ToString::to_string,
            )
        };

        let head = match self.context.head() {
            HeadSource::Photo(photo) => HeadView::Photo(photo.to_string()),
            HeadSource::Default => HeadView::Default(fixed_url(FixedAsset::DefaultHead)),
        };

        let slots = Slot::ALL
            .iter()
            .map(|slot| {
                let view = self.context.outfits.get(*slot).and_then(|filename| {
                    index.resolve(filename).map(|url| SlotView {
                        filename: filename.to_string(),
                        url,
                    })
                });
                (*slot, view)
            })
            .collect();

        ViewModel {
            phase: self.phase.clone(),
            mode: self.context.mode,
            connectivity: self.connectivity,
            head,
            slots,
            logo_left: fixed_url(FixedAsset::LogoLeft),
            logo_right: fixed_url(FixedAsset::LogoRight),
            photo_source: self.context.photo_source.clone(),
        }
    }

    /// Session context
    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Asset readiness
    #[must_use]
    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    /// Published asset index
    #[must_use]
    pub fn index(&self) -> &AssetIndex {
        &self.index
    }

    /// Channel status as last reported
    #[must_use]
    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Generation of the most recent load
    #[must_use]
    pub fn load_generation(&self) -> u64 {
        self.load_generation
    }

    /// Whether the idle refresh timer is running
    #[must_use]
    pub fn refresh_running(&self) -> bool {
        self.refresh.is_running()
    }

    /// Epoch of the idle refresh timer
    #[must_use]
    pub fn refresh_epoch(&self) -> u64 {
        self.refresh.epoch()
    }

    fn on_channel_event(&mut self, event: &ChannelEvent) {
        match event {
            ChannelEvent::Connected => self.connectivity = Connectivity::Connected,
            ChannelEvent::Disconnected => self.connectivity = Connectivity::Disconnected,
            _ => {}
        }

        let index = Arc::clone(&self.index);
        let next = self
            .context
            .apply(event, || random_outfit(&index, &mut rand::thread_rng()));
        if next.mode != self.context.mode {
            info!(from = self.context.mode.as_str(), to = next.mode.as_str(), "Mode change");
        }
        self.context = next;
    }

    fn on_assets_loaded(&mut self, generation: u64, result: Result<LoadedAssets, AssetError>) {
        if generation != self.load_generation {
            debug!(generation, current = self.load_generation, "Ignoring stale asset load");
            return;
        }
        self.load_task = None;

        match result {
            Ok(loaded) => {
                info!(
                    loaded = loaded.report.loaded,
                    failed = loaded.report.failed.len(),
                    "Assets ready"
                );
                self.index = Arc::new(loaded.index);
                self.phase = LoadPhase::Ready;
                // the running generator still draws from the replaced index
                self.refresh.stop();
                if self.context.mode == Mode::Idle {
                    self.context = self.context.with_outfits(loaded.default_outfits);
                }
            }
            Err(e) if !self.index.is_empty() => {
                warn!(error = %e, assets = self.index.len(), "Asset reload failed; keeping previous index");
                self.phase = LoadPhase::Ready;
            }
            Err(e) => {
                error!(error = %e, "Asset loading failed");
                self.phase = LoadPhase::Failed(e.to_string());
            }
        }
    }

    fn on_refresh(&mut self, epoch: u64, outfits: OutfitSelection) {
        if !self.refresh.is_current(epoch) || self.context.mode != Mode::Idle {
            trace!(epoch, "Dropping stale refresh tick");
            return;
        }
        self.context = self.context.with_outfits(outfits);
    }

    fn authorize(&mut self, key: ApiKey) {
        info!("Re-authorizing; discarding asset index");
        self.loader = self.loader.take().map(|loader| loader.with_api_key(key));
        self.index = Arc::new(AssetIndex::new(self.config.asset_base.clone()));
        self.refresh.stop();
        self.begin_loading();
    }

    /// Start a load under a new generation
    ///
    /// A published index stays on screen (and keeps feeding the idle
    /// refresh) until the new one replaces it; only an empty index shows
    /// the loading screen.
    fn begin_loading(&mut self) {
        self.load_generation += 1;
        if self.index.is_empty() {
            self.phase = LoadPhase::Loading;
        }
        if let Some(task) = self.load_task.take() {
            task.abort();
        }

        let Some(loader) = self.loader.clone() else {
            debug!(generation = self.load_generation, "No asset loader attached");
            return;
        };
        let inbox = self.inbox_tx.clone();
        let generation = self.load_generation;
        self.load_task = Some(tokio::spawn(async move {
            let result = loader.load_from_backend().await;
            if inbox
                .send(EngineInput::AssetsLoaded { generation, result })
                .await
                .is_err()
            {
                debug!("Engine stopped before asset load finished");
            }
        }));
    }

    fn sync_refresh(&mut self) {
        let should_run = self.context.mode == Mode::Idle && self.phase == LoadPhase::Ready;

        if should_run && !self.refresh.is_running() {
            let index = Arc::clone(&self.index);
            let inbox = self.inbox_tx.clone();
            self.refresh.start(
                move |epoch| {
                    let outfits = random_outfit(&index, &mut rand::thread_rng());
                    if inbox.try_send(EngineInput::Refresh { epoch, outfits }).is_err() {
                        warn!(epoch, "Engine inbox full; skipping idle refresh");
                    }
                },
                self.config.refresh_interval,
            );
        } else if !should_run && self.refresh.is_running() {
            self.refresh.stop();
        }
    }

    fn publish(&self) {
        let next = self.view();
        self.view_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

impl Drop for DisplayEngine {
    fn drop(&mut self) {
        if let Some(task) = self.load_task.take() {
            task.abort();
        }
    }
}

fn placeholder_view() -> ViewModel {
    ViewModel {
        phase: LoadPhase::Loading,
        mode: Mode::Idle,
        connectivity: Connectivity::Connecting,
        head: HeadView::Default(String::new()),
        slots: Vec::new(),
        logo_left: String::new(),
        logo_right: String::new(),
        photo_source: None,
    }
}
