//! Transport Traits
//!
//! The seam between the channel manager and the wire. A transport yields raw
//! text frames; parsing into [`ChannelEvent`](crate::events::ChannelEvent)s
//! happens above it, so every transport shares one decoder path.

use std::fmt;

use async_trait::async_trait;
use rand::RngCore;
use thiserror::Error;

/// Identifies one connection attempt in logs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId([u8; 6]);

impl ConnectionId {
    /// Fresh random id
    #[must_use]
    pub fn new() -> Self {
        let mut bytes = [0u8; 6];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", hex::encode(self.0))
    }
}

/// Transport failures
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not open the connection
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Peer closed the stream
    #[error("connection closed")]
    ConnectionClosed,

    /// Reading from an open stream failed
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Backend rejected the shared secret
    #[error("authentication rejected")]
    AuthenticationFailed,

    /// Operation not valid in the transport's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Opening the connection took longer than the configured timeout
    #[error("connect timed out after {0}ms")]
    Timeout(u64),

    /// Socket-level failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Display-side end of the real-time channel
///
/// A transport is single-use: the manager builds a new one for every
/// connection attempt and drops it when the connection ends.
#[async_trait]
pub trait EventTransport: Send {
    /// Open the connection
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// Close the connection; idempotent
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Wait for the next complete text frame
    ///
    /// Returns [`TransportError::ConnectionClosed`] once the peer has gone.
    async fn recv(&mut self) -> Result<String, TransportError>;

    /// Whether the connection is currently open
    fn is_connected(&self) -> bool;
}
