//! Transport Factory
//!
//! Builds the closure the channel manager calls for every connection
//! attempt. Each call returns a fresh, unconnected transport.

use std::sync::Arc;

use super::config::{ChannelConfig, TransportType};
use super::sse::SseTransport;
use super::traits::{EventTransport, TransportError};
use crate::auth::ApiKey;
use crate::config::BackendConfig;

#[cfg(feature = "websocket")]
use super::websocket::WebSocketTransport;

/// Produces one transport per connection attempt
pub type TransportFactory =
    Arc<dyn Fn() -> Result<Box<dyn EventTransport>, TransportError> + Send + Sync>;

/// Create a transport factory from configuration
///
/// # Errors
///
/// Returns `TransportError::InvalidState` if:
/// - `InProcess` is requested (the caller owns the frame sender; build the
///   factory around `InProcessTransport::new_pair()` directly)
/// - `WebSocket` is requested in a build without the `websocket` feature
pub fn create_transport_factory(
    channel: &ChannelConfig,
    backend: &BackendConfig,
    client: reqwest::Client,
    api_key: Option<ApiKey>,
) -> Result<TransportFactory, TransportError> {
    let url = backend.endpoint(&channel.events_path);
    let connect_timeout = channel.connect_timeout();

    match channel.transport {
        TransportType::Sse => Ok(Arc::new(move || {
            Ok(Box::new(SseTransport::new(
                client.clone(),
                url.clone(),
                api_key.clone(),
                connect_timeout,
            )) as Box<dyn EventTransport>)
        })),

        #[cfg(feature = "websocket")]
        TransportType::WebSocket => {
            let url = websocket_url(&url);
            Ok(Arc::new(move || {
                Ok(Box::new(WebSocketTransport::new(
                    url.clone(),
                    api_key.clone(),
                    connect_timeout,
                )) as Box<dyn EventTransport>)
            }))
        }

        #[cfg(not(feature = "websocket"))]
        TransportType::WebSocket => Err(TransportError::InvalidState(
            "WebSocket transport requires the `websocket` feature".into(),
        )),

        TransportType::InProcess => Err(TransportError::InvalidState(
            "InProcess transport has no backend URL; use InProcessTransport::new_pair() directly"
                .into(),
        )),
    }
}

/// Map an `http(s)://` URL onto the matching `ws(s)://` scheme
#[must_use]
pub fn websocket_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        url.to_string()
    }
}
