//! Asset Probes
//!
//! A probe fetches one asset and checks that it decodes as an image. The
//! cache only records assets whose probe succeeded; a failed probe is never
//! retried.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Why a single asset could not be loaded
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Network failure fetching the asset
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("unexpected status {0}")]
    Status(u16),

    /// Backend returned an empty body
    #[error("empty body")]
    Empty,

    /// Body is not a decodable image
    #[error("not a decodable image: {0}")]
    Decode(String),
}

/// Loads one asset and reports whether it is usable
#[async_trait]
pub trait AssetProbe: Send + Sync {
    /// Fetch and decode the asset at `url`
    async fn probe(&self, url: &str) -> Result<(), ProbeError>;
}

/// HTTP probe: GET the asset and decode its image header
#[derive(Clone, Debug)]
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    /// Create a probe sharing an existing HTTP client
    #[must_use]
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl AssetProbe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<(), ProbeError> {
        let response = self.client.get(url).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(ProbeError::Empty);
        }

        decode_header(&body)
    }
}

/// Check that `body` carries a recognizable image with valid dimensions
fn decode_header(body: &[u8]) -> Result<(), ProbeError> {
    let (width, height) = image::ImageReader::new(Cursor::new(body))
        .with_guessed_format()
        .map_err(|e| ProbeError::Decode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ProbeError::Decode(e.to_string()))?;

    if width == 0 || height == 0 {
        return Err(ProbeError::Decode(format!("degenerate size {width}x{height}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal 1x1 GIF89a
    const TINY_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
        0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
        0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
    ];

    #[test]
    fn test_decode_header_accepts_gif() {
        assert!(decode_header(TINY_GIF).is_ok());
    }

    #[test]
    fn test_decode_header_rejects_html() {
        let result = decode_header(b"<html><body>Not Found</body></html>");
        assert!(matches!(result, Err(ProbeError::Decode(_))));
    }

    #[test]
    fn test_probe_error_display() {
        assert!(ProbeError::Status(404).to_string().contains("404"));
        assert_eq!(ProbeError::Empty.to_string(), "empty body");
    }
}
