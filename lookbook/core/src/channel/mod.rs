//! Channel Manager
//!
//! Owns the real-time connection to the backend of record and turns its
//! frames into [`ChannelEvent`]s for the engine.
//!
//! # Lifecycle
//!
//! ```text
//!   connect() ──► Connecting ──handshake──► Connected
//!                    ▲                         │ error / close
//!                    │ retry (if still         ▼
//!                    └──── Disconnected) ◄── Disconnected
//! ```
//!
//! - Exactly one connection is live at a time. `connect()` releases the
//!   previous connection and cancels a pending retry before opening a new one.
//! - A lost connection schedules a single retry after the configured delay.
//!   When it fires, the retry only reopens if the channel is still
//!   Disconnected under the same generation; a connection that recovered in
//!   the meantime cancels it.
//! - `teardown()` is terminal for that handle: no retry, no further events.
//!
//! Keepalives are recorded and dropped here. Unknown event types and
//! malformed frames are logged and dropped; the connection stays open.
//!
//! # Transports
//!
//! - [`SseTransport`]: server-sent events (default)
//! - `WebSocketTransport`: WebSocket text frames (`websocket` feature)
//! - [`InProcessTransport`]: tokio channel, for embedding and tests

pub mod config;
mod factory;
mod in_process;
mod sse;
mod traits;
#[cfg(feature = "websocket")]
mod websocket;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::events::{parse_frame, ChannelEvent, EventParseError};

pub use config::{ChannelConfig, TransportType};
pub use factory::{create_transport_factory, websocket_url, TransportFactory};
pub use in_process::InProcessTransport;
pub use sse::{SseDecoder, SseTransport, MAX_EVENT_SIZE};
pub use traits::{ConnectionId, EventTransport, TransportError};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;

/// Connectivity as shown to the operator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    /// Handshake in progress
    #[default]
    Connecting,
    /// Stream open
    Connected,
    /// Stream lost or torn down
    Disconnected,
}

impl Connectivity {
    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Identifies one `connect()` call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelHandle {
    /// Log identifier of the connection
    pub id: ConnectionId,
    /// Monotonic generation; only the newest handle is live
    pub generation: u64,
}

struct LiveConnection {
    handle: ChannelHandle,
    shutdown: oneshot::Sender<()>,
    _task: JoinHandle<()>,
}

impl LiveConnection {
    fn release(self) {
        debug!(connection = %self.handle.id, "Releasing channel connection");
        // The task closes its transport when the signal (or the dropped
        // sender) arrives
        let _ = self.shutdown.send(());
    }
}

struct RetryHandle {
    generation: u64,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct ChannelState {
    connectivity: Connectivity,
    generation: u64,
    handle: Option<ChannelHandle>,
    live: Option<LiveConnection>,
    retry: Option<RetryHandle>,
    torn_down: bool,
    last_event_at: Option<Instant>,
}

impl ChannelState {
    fn cancel_retry(&mut self) {
        if let Some(retry) = self.retry.take() {
            debug!(generation = retry.generation, "Cancelling scheduled retry");
            retry.task.abort();
        }
    }

    fn is_current(&self, handle: ChannelHandle) -> bool {
        self.generation == handle.generation && !self.torn_down
    }
}

struct Shared {
    retry_delay: Duration,
    factory: Mutex<TransportFactory>,
    events: mpsc::Sender<ChannelEvent>,
    state: Mutex<ChannelState>,
}

/// Owner of the real-time channel
///
/// Cheap to clone; clones share the same connection.
#[derive(Clone)]
pub struct ChannelManager {
    shared: Arc<Shared>,
}

impl ChannelManager {
    /// Create a manager that delivers events into `events`
    #[must_use]
    pub fn new(
        factory: TransportFactory,
        retry_delay: Duration,
        events: mpsc::Sender<ChannelEvent>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                retry_delay,
                factory: Mutex::new(factory),
                events,
                state: Mutex::new(ChannelState::default()),
            }),
        }
    }

    /// Create a manager using the retry delay from `config`
    #[must_use]
    pub fn with_config(
        factory: TransportFactory,
        config: &ChannelConfig,
        events: mpsc::Sender<ChannelEvent>,
    ) -> Self {
        Self::new(factory, config.retry_delay(), events)
    }

    /// Open a connection, replacing any existing one
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn connect(&self) -> ChannelHandle {
        let mut state = self.shared.state.lock();
        self.shared.open(&mut state)
    }

    /// Use `factory` for every later connection attempt, retries included
    ///
    /// The live connection keeps its transport; call [`connect`](Self::connect)
    /// to switch over now.
    pub fn replace_factory(&self, factory: TransportFactory) {
        *self.shared.factory.lock() = factory;
        debug!("Channel transport factory replaced");
    }

    /// Tear down the connection opened as `handle`
    ///
    /// Terminal: no retry is scheduled and no further events are emitted.
    /// A stale handle (superseded by a later `connect()`) is ignored.
    pub fn teardown(&self, handle: ChannelHandle) {
        let mut state = self.shared.state.lock();
        if state.generation != handle.generation {
            debug!(connection = %handle.id, "Ignoring teardown of superseded handle");
            return;
        }
        state.torn_down = true;
        state.cancel_retry();
        if let Some(live) = state.live.take() {
            live.release();
        }
        state.connectivity = Connectivity::Disconnected;
        info!(connection = %handle.id, "Channel torn down");
    }

    /// Tear down whatever connection is current
    pub fn shutdown(&self) {
        let current = self.current();
        if let Some(handle) = current {
            self.teardown(handle);
        }
    }

    /// Current connectivity
    #[must_use]
    pub fn connectivity(&self) -> Connectivity {
        self.shared.state.lock().connectivity
    }

    /// Whether a retry is scheduled and has not fired yet
    #[must_use]
    pub fn retry_pending(&self) -> bool {
        self.shared.state.lock().retry.is_some()
    }

    /// Handle of the newest connection, unless torn down
    #[must_use]
    pub fn current(&self) -> Option<ChannelHandle> {
        let state = self.shared.state.lock();
        if state.torn_down {
            return None;
        }
        state.handle
    }

    /// When the last frame (keepalives included) arrived
    #[must_use]
    pub fn last_event_at(&self) -> Option<Instant> {
        self.shared.state.lock().last_event_at
    }
}

impl Shared {
    fn open(self: &Arc<Self>, state: &mut ChannelState) -> ChannelHandle {
        state.cancel_retry();
        if let Some(live) = state.live.take() {
            live.release();
        }

        state.generation += 1;
        state.torn_down = false;
        state.connectivity = Connectivity::Connecting;

        let handle = ChannelHandle {
            id: ConnectionId::new(),
            generation: state.generation,
        };
        state.handle = Some(handle);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_connection(Arc::clone(self), handle, shutdown_rx));
        state.live = Some(LiveConnection {
            handle,
            shutdown: shutdown_tx,
            _task: task,
        });

        info!(connection = %handle.id, generation = handle.generation, "Opening channel");
        handle
    }

    fn mark_connected(&self, handle: ChannelHandle) -> bool {
        let mut state = self.state.lock();
        if !state.is_current(handle) {
            return false;
        }
        state.cancel_retry();
        state.connectivity = Connectivity::Connected;
        true
    }

    async fn emit(&self, handle: ChannelHandle, event: ChannelEvent) {
        let current = self.state.lock().is_current(handle);
        if !current {
            trace!(connection = %handle.id, kind = event.kind(), "Suppressing event from stale connection");
            return;
        }
        if self.events.send(event).await.is_err() {
            debug!("Event receiver dropped");
        }
    }

    async fn dispatch(&self, handle: ChannelHandle, frame: &str) {
        let parsed = parse_frame(frame);
        self.state.lock().last_event_at = Some(Instant::now());

        match parsed {
            Ok(ChannelEvent::Keepalive { timestamp }) => {
                trace!(connection = %handle.id, ?timestamp, "Keepalive");
            }
            Ok(event) => {
                debug!(connection = %handle.id, kind = event.kind(), "Channel event");
                self.emit(handle, event).await;
            }
            Err(EventParseError::UnknownType(kind)) => {
                warn!(connection = %handle.id, kind = %kind, "Dropping event of unknown type");
            }
            Err(e) => {
                warn!(connection = %handle.id, error = %e, "Dropping malformed frame");
            }
        }
    }

    async fn connection_lost(self: &Arc<Self>, handle: ChannelHandle) {
        {
            let mut state = self.state.lock();
            if !state.is_current(handle) {
                return;
            }
            state.connectivity = Connectivity::Disconnected;
            state.live = None;
            state.cancel_retry();

            let shared = Arc::clone(self);
            let delay = self.retry_delay;
            let generation = handle.generation;
            let task = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                shared.retry_fired(generation);
            });
            state.retry = Some(RetryHandle { generation, task });
        }

        info!(
            connection = %handle.id,
            retry_in_ms = u64::try_from(self.retry_delay.as_millis()).unwrap_or(u64::MAX),
            "Channel disconnected; retry scheduled"
        );
        self.emit(handle, ChannelEvent::Disconnected).await;
    }

    fn retry_fired(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock();
        match state.retry.take() {
            Some(retry) if retry.generation == generation => {}
            other => {
                state.retry = other;
                return;
            }
        }

        if state.torn_down
            || state.generation != generation
            || state.connectivity != Connectivity::Disconnected
        {
            debug!(generation, "Skipping retry; channel already recovered");
            return;
        }

        info!(generation, "Retrying channel connection");
        self.open(&mut state);
    }
}

async fn close_transport(transport: &mut Box<dyn EventTransport>, handle: ChannelHandle) {
    if let Err(e) = transport.disconnect().await {
        debug!(connection = %handle.id, error = %e, "Transport close failed");
    }
}

async fn run_connection(
    shared: Arc<Shared>,
    handle: ChannelHandle,
    mut shutdown: oneshot::Receiver<()>,
) {
    let factory = Arc::clone(&*shared.factory.lock());
    let mut transport = match factory() {
        Ok(transport) => transport,
        Err(e) => {
            warn!(connection = %handle.id, error = %e, "Could not create transport");
            shared.connection_lost(handle).await;
            return;
        }
    };

    let opened = tokio::select! {
        biased;
        _ = &mut shutdown => None,
        result = transport.connect() => Some(result),
    };
    match opened {
        None => {
            close_transport(&mut transport, handle).await;
            return;
        }
        Some(Err(e)) => {
            warn!(connection = %handle.id, error = %e, "Channel connect failed");
            shared.connection_lost(handle).await;
            return;
        }
        Some(Ok(())) => {}
    }

    if !shared.mark_connected(handle) {
        close_transport(&mut transport, handle).await;
        return;
    }
    info!(connection = %handle.id, "Channel connected");
    shared.emit(handle, ChannelEvent::Connected).await;

    loop {
        let next = tokio::select! {
            biased;
            _ = &mut shutdown => None,
            frame = transport.recv() => Some(frame),
        };
        match next {
            None => {
                close_transport(&mut transport, handle).await;
                debug!(connection = %handle.id, "Channel released");
                return;
            }
            Some(Ok(frame)) => shared.dispatch(handle, &frame).await,
            Some(Err(e)) => {
                warn!(connection = %handle.id, error = %e, "Channel lost");
                close_transport(&mut transport, handle).await;
                shared.connection_lost(handle).await;
                return;
            }
        }
    }
}
