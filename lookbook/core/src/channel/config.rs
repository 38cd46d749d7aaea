//! Channel Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which wire carries the event stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// Server-sent events over a long-lived HTTP response
    #[default]
    Sse,
    /// WebSocket text frames
    #[serde(alias = "ws")]
    WebSocket,
    /// In-memory channel; tests and embedded use only
    #[serde(alias = "inprocess")]
    InProcess,
}

impl TransportType {
    /// Parse a user-supplied transport name
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "sse" | "eventsource" => Some(Self::Sse),
            "websocket" | "ws" => Some(Self::WebSocket),
            "inprocess" | "in-process" | "embedded" => Some(Self::InProcess),
            _ => None,
        }
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sse => "sse",
            Self::WebSocket => "websocket",
            Self::InProcess => "inprocess",
        }
    }
}

/// Real-time channel settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Which transport to use
    pub transport: TransportType,

    /// Path of the event endpoint, relative to the backend base URL
    pub events_path: String,

    /// Delay before reopening a lost connection
    pub retry_delay_ms: u64,

    /// How long a connection attempt may take
    pub connect_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            transport: TransportType::default(),
            events_path: "/events".to_string(),
            retry_delay_ms: 5000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl ChannelConfig {
    /// Retry delay as a [`Duration`]
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Connect timeout as a [`Duration`]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
