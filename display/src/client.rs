//! Display Client
//!
//! Thin wrapper that assembles the headless engine for a rendering surface.
//! The surface holds no business logic; it asks the client to start, to
//! reconnect or reload on operator request, and to shut down, and it renders
//! whatever [`ViewModel`] the engine publishes.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use lookbook_core::{
    create_transport_factory, ApiKey, AssetCache, AssetLoader, BackendConfig, ChannelConfig,
    ChannelEvent, ChannelHandle, ChannelManager, Connectivity, DisplayEngine, EngineConfig,
    EngineInput, HttpProbe, LookbookConfig, ViewModel,
};

/// Capacity of the channel -> engine event queue
const EVENT_QUEUE: usize = 64;

/// Client owning the channel and the engine task
pub struct DisplayClient {
    http: reqwest::Client,
    backend: BackendConfig,
    channel_config: ChannelConfig,
    channel: ChannelManager,
    inbox: mpsc::Sender<EngineInput>,
    view: watch::Receiver<ViewModel>,
    pending: Option<(DisplayEngine, mpsc::Receiver<ChannelEvent>)>,
    engine_task: Option<JoinHandle<()>>,
}

impl DisplayClient {
    /// Build the loader, channel and engine from configuration
    ///
    /// Nothing touches the network until [`start`](Self::start).
    pub fn new(config: &LookbookConfig) -> anyhow::Result<Self> {
        // Per-request timeouts only: the SSE stream must stay open indefinitely
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        let backend = &config.backend;
        let probe = HttpProbe::new(http.clone(), backend.request_timeout());
        let cache = AssetCache::new(
            Arc::new(probe),
            backend.asset_base_url(),
            config.display.fixed_assets(),
        );
        let loader = AssetLoader::new(
            http.clone(),
            backend.manifest_url(),
            backend.api_key.clone(),
            backend.request_timeout(),
            cache,
        );

        let factory = create_transport_factory(
            &config.channel,
            backend,
            http.clone(),
            backend.api_key.clone(),
        )
        .context("Failed to create channel transport")?;
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        let channel = ChannelManager::with_config(factory, &config.channel, events_tx);

        let engine = DisplayEngine::new(EngineConfig::from_config(config)).with_loader(loader);
        let inbox = engine.inbox();
        let view = engine.subscribe();

        info!(
            backend = %backend.base_url,
            transport = config.channel.transport.as_str(),
            source = %config.source(),
            "Display client configured"
        );

        Ok(Self {
            http,
            backend: backend.clone(),
            channel_config: config.channel.clone(),
            channel,
            inbox,
            view,
            pending: Some((engine, events_rx)),
            engine_task: None,
        })
    }

    /// Spawn the engine (which starts the asset load) and open the channel
    ///
    /// The two proceed independently. Calling this twice is a no-op.
    pub fn start(&mut self) {
        let Some((engine, events)) = self.pending.take() else {
            debug!("Display client already started");
            return;
        };
        self.engine_task = Some(tokio::spawn(engine.run(events)));
        self.channel.connect();
    }

    /// Replace the channel connection now, cancelling any pending retry
    pub fn reconnect(&self) -> ChannelHandle {
        info!("Operator requested reconnect");
        self.channel.connect()
    }

    /// Re-authenticate with a new key
    ///
    /// The asset index is discarded and rebuilt under the new key, and the
    /// channel reconnects with it; later retries use it too.
    pub async fn authorize(&self, key: ApiKey) -> anyhow::Result<()> {
        let factory = create_transport_factory(
            &self.channel_config,
            &self.backend,
            self.http.clone(),
            Some(key.clone()),
        )
        .context("Failed to rebuild channel transport")?;
        self.channel.replace_factory(factory);
        self.send(EngineInput::Authorize(key)).await?;

        if self.engine_task.is_some() {
            info!("Reconnecting channel with the new key");
            self.channel.connect();
        }
        Ok(())
    }

    /// Fetch the manifest and probe every asset again
    pub async fn reload(&self) -> anyhow::Result<()> {
        self.send(EngineInput::Reload).await
    }

    /// Subscribe to view updates
    pub fn view(&self) -> watch::Receiver<ViewModel> {
        self.view.clone()
    }

    /// Channel state as tracked by the manager
    pub fn connectivity(&self) -> Connectivity {
        self.channel.connectivity()
    }

    /// Tear down the channel and stop the engine, waiting for it to exit
    pub async fn shutdown(&mut self) {
        self.channel.shutdown();
        // The engine may already be gone; nothing else to release then
        let _ = self.inbox.send(EngineInput::Shutdown).await;
        if let Some(task) = self.engine_task.take() {
            let _ = task.await;
        }
        info!("Display client stopped");
    }

    async fn send(&self, input: EngineInput) -> anyhow::Result<()> {
        self.inbox
            .send(input)
            .await
            .map_err(|_| anyhow!("display engine is not running"))
    }
}
