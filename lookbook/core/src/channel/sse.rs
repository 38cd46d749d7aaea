//! Server-Sent Events Transport
//!
//! Holds one long-lived `GET` on the event endpoint and cuts the
//! `text/event-stream` body into frames:
//!
//! ```text
//! : comment, ignored
//! data: {"type":"idle"}
//! <blank line ends the event>
//! ```
//!
//! Multiple `data:` lines in one event are joined with `\n`. `event:`,
//! `id:` and `retry:` fields are read and ignored; the frame's JSON `type`
//! is authoritative and reconnect timing belongs to the channel manager.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::StatusCode;

use super::traits::{EventTransport, TransportError};
use crate::auth::ApiKey;

/// Largest event (pending line plus accumulated data) the decoder will hold
pub const MAX_EVENT_SIZE: usize = 1024 * 1024;

/// Incremental `text/event-stream` decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
    ready: VecDeque<String>,
}

impl SseDecoder {
    /// Empty decoder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes from the response body
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ReceiveFailed`] if a single event grows past
    /// [`MAX_EVENT_SIZE`]. The decoder is reset in that case.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), TransportError> {
        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            self.process_line(line.trim_end_matches(&['\n', '\r'][..]));
        }

        let pending = self.buffer.len() + self.data.iter().map(String::len).sum::<usize>();
        if pending > MAX_EVENT_SIZE {
            self.buffer.clear();
            self.data.clear();
            return Err(TransportError::ReceiveFailed(format!(
                "event exceeds {MAX_EVENT_SIZE} bytes"
            )));
        }
        Ok(())
    }

    /// Next complete frame, if any
    pub fn next_frame(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    fn process_line(&mut self, line: &str) {
        if line.is_empty() {
            if !self.data.is_empty() {
                let frame = self.data.join("\n");
                self.data.clear();
                self.ready.push_back(frame);
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
    }
}

/// Event transport over a streaming HTTP response
pub struct SseTransport {
    client: reqwest::Client,
    url: String,
    api_key: Option<ApiKey>,
    connect_timeout: Duration,
    stream: Option<BoxStream<'static, reqwest::Result<Vec<u8>>>>,
    decoder: SseDecoder,
}

impl SseTransport {
    /// Create a transport for `url`
    ///
    /// `client` must not carry a total request timeout, or the stream would
    /// be cut after that long.
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        api_key: Option<ApiKey>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
            connect_timeout,
            stream: None,
            decoder: SseDecoder::new(),
        }
    }

    /// Event endpoint URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventTransport for SseTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Err(TransportError::InvalidState("Already connected".to_string()));
        }

        let mut request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_blank()) {
            request = request.header(ApiKey::HEADER, key.expose());
        }

        let timeout_ms = u64::try_from(self.connect_timeout.as_millis()).unwrap_or(u64::MAX);
        let response = tokio::time::timeout(self.connect_timeout, request.send())
            .await
            .map_err(|_| TransportError::Timeout(timeout_ms))?
            .map_err(|e| {
                TransportError::ConnectionFailed(format!("Failed to reach {}: {e}", self.url))
            })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(TransportError::AuthenticationFailed)
            }
            status if !status.is_success() => {
                return Err(TransportError::ConnectionFailed(format!(
                    "{} answered {status}",
                    self.url
                )))
            }
            _ => {}
        }

        self.decoder = SseDecoder::new();
        self.stream = Some(
            response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
        );
        tracing::debug!(url = %self.url, "Event stream opened");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.stream = None;
        Ok(())
    }

    async fn recv(&mut self) -> Result<String, TransportError> {
        loop {
            if let Some(frame) = self.decoder.next_frame() {
                return Ok(frame);
            }

            let stream = self
                .stream
                .as_mut()
                .ok_or_else(|| TransportError::InvalidState("Not connected".to_string()))?;

            match stream.next().await {
                Some(Ok(chunk)) => {
                    if let Err(e) = self.decoder.push(&chunk) {
                        self.stream = None;
                        return Err(e);
                    }
                }
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drain(decoder: &mut SseDecoder) -> Vec<String> {
        std::iter::from_fn(|| decoder.next_frame()).collect()
    }

    #[test]
    fn test_single_event() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: {\"type\":\"idle\"}\n\n").unwrap();
        assert_eq!(drain(&mut decoder), vec![r#"{"type":"idle"}"#.to_string()]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: {\"ty").unwrap();
        assert!(decoder.next_frame().is_none());
        decoder.push(b"pe\":\"timeout\"}\r\n").unwrap();
        assert!(decoder.next_frame().is_none());
        decoder.push(b"\r\n").unwrap();
        assert_eq!(drain(&mut decoder), vec![r#"{"type":"timeout"}"#.to_string()]);
    }

    #[test]
    fn test_comments_and_other_fields_ignored() {
        let mut decoder = SseDecoder::new();
        decoder
            .push(b": keepalive comment\n\nevent: message\nid: 7\nretry: 1000\ndata: x\n\n")
            .unwrap();
        assert_eq!(drain(&mut decoder), vec!["x".to_string()]);
    }

    #[test]
    fn test_multiline_data_joined() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: {\"type\":\ndata:\"idle\"}\n\n").unwrap();
        assert_eq!(drain(&mut decoder), vec!["{\"type\":\n\"idle\"}".to_string()]);
    }

    #[test]
    fn test_several_events_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        decoder.push(b"data: a\n\ndata: b\n\n\n\ndata: c\n").unwrap();
        assert_eq!(drain(&mut decoder), vec!["a".to_string(), "b".to_string()]);
        decoder.push(b"\n").unwrap();
        assert_eq!(drain(&mut decoder), vec!["c".to_string()]);
    }

    #[test]
    fn test_oversized_event_rejected() {
        let mut decoder = SseDecoder::new();
        let huge = vec![b'x'; MAX_EVENT_SIZE + 1];
        assert!(matches!(
            decoder.push(&huge),
            Err(TransportError::ReceiveFailed(_))
        ));

        decoder.push(b"data: ok\n\n").unwrap();
        assert_eq!(drain(&mut decoder), vec!["ok".to_string()]);
    }

    #[tokio::test]
    async fn test_recv_before_connect_is_invalid() {
        let mut transport = SseTransport::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/events",
            None,
            Duration::from_millis(100),
        );
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.recv().await,
            Err(TransportError::InvalidState(_))
        ));
    }
}
