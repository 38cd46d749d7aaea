//! WebSocket Transport
//!
//! Each text message is one frame. Ping, pong and binary messages are
//! skipped; a close frame or end of stream ends the connection.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::traits::{EventTransport, TransportError};
use crate::auth::ApiKey;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Event transport over a WebSocket
pub struct WebSocketTransport {
    url: String,
    api_key: Option<ApiKey>,
    connect_timeout: Duration,
    stream: Option<WsStream>,
}

impl WebSocketTransport {
    /// Create a transport for a `ws://` or `wss://` URL
    pub fn new(url: impl Into<String>, api_key: Option<ApiKey>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            api_key,
            connect_timeout,
            stream: None,
        }
    }

    /// Event endpoint URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn map_handshake_error(url: &str, error: WsError) -> TransportError {
    match error {
        WsError::Http(response) if matches!(response.status().as_u16(), 401 | 403) => {
            TransportError::AuthenticationFailed
        }
        WsError::Io(e) => TransportError::Io(e),
        other => TransportError::ConnectionFailed(format!("Failed to reach {url}: {other}")),
    }
}

#[async_trait]
impl EventTransport for WebSocketTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Err(TransportError::InvalidState("Already connected".to_string()));
        }

        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_blank()) {
            let value = HeaderValue::from_str(key.expose()).map_err(|_| {
                TransportError::InvalidState("API key is not a valid header value".to_string())
            })?;
            request.headers_mut().insert(ApiKey::HEADER, value);
        }

        let timeout_ms = u64::try_from(self.connect_timeout.as_millis()).unwrap_or(u64::MAX);
        let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .map_err(|_| TransportError::Timeout(timeout_ms))?
            .map_err(|e| map_handshake_error(&self.url, e))?;

        self.stream = Some(stream);
        tracing::debug!(url = %self.url, "WebSocket opened");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = SinkExt::close(&mut stream).await {
                tracing::debug!(error = %e, "WebSocket close handshake failed");
            }
        }
        Ok(())
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        loop {
            let stream = self
                .stream
                .as_mut()
                .ok_or_else(|| TransportError::InvalidState("Not connected".to_string()))?;

            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "Server closed WebSocket");
                    self.stream = None;
                    return Err(TransportError::ConnectionClosed);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.stream = None;
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
                None => {
                    self.stream = None;
                    return Err(TransportError::ConnectionClosed);
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}
