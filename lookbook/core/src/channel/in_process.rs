//! In-Process Transport
//!
//! Frames are pushed through a tokio channel instead of a socket. Used when
//! the event source lives in the same process, and by the tests to drive
//! the channel manager deterministically.
//!
//! ```ignore
//! let (transport, frames) = InProcessTransport::new_pair();
//! frames.send(r#"{"type":"idle"}"#.to_string()).await?;
//! ```
//!
//! Dropping the sender ends the connection as if the peer had closed it.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::traits::{EventTransport, TransportError};

/// Transport backed by an mpsc receiver of raw frames
pub struct InProcessTransport {
    frames: Option<mpsc::Receiver<String>>,
    connected: bool,
    refuse_connect: bool,
}

impl InProcessTransport {
    /// Create a transport and the sender that feeds it
    #[must_use]
    pub fn new_pair() -> (Self, mpsc::Sender<String>) {
        Self::new_pair_with_capacity(64)
    }

    /// Same as [`new_pair`](Self::new_pair) with a custom buffer size
    #[must_use]
    pub fn new_pair_with_capacity(capacity: usize) -> (Self, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let transport = Self {
            frames: Some(rx),
            connected: false,
            refuse_connect: false,
        };
        (transport, tx)
    }

    /// A transport whose `connect` always fails
    #[must_use]
    pub fn refusing() -> Self {
        Self {
            frames: None,
            connected: false,
            refuse_connect: true,
        }
    }
}

#[async_trait]
impl EventTransport for InProcessTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.refuse_connect {
            return Err(TransportError::ConnectionFailed(
                "in-process peer refused".to_string(),
            ));
        }
        if self.frames.is_none() {
            return Err(TransportError::InvalidState(
                "Transport already used".to_string(),
            ));
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.connected = false;
        // Dropping the receiver lets the feeding side observe the close
        self.frames = None;
        Ok(())
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        if !self.connected {
            return Err(TransportError::InvalidState("Not connected".to_string()));
        }
        let frames = self
            .frames
            .as_mut()
            .ok_or(TransportError::ConnectionClosed)?;
        match frames.recv().await {
            Some(frame) => Ok(frame),
            None => {
                self.connected = false;
                Err(TransportError::ConnectionClosed)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
