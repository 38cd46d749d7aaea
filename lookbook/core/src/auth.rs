//! Access Credentials
//!
//! The backend guards its manifest and event endpoints with a static shared
//! secret sent as a request header. The secret is handed to the loader and
//! the channel factory at startup instead of living in ambient global state,
//! so tests and operators can substitute it freely.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Shared-secret credential for the backend
///
/// `Debug` output is redacted so the key never lands in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Header the backend expects the key in
    pub const HEADER: &'static str = "x-api-key";

    /// Wrap a raw key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key for building a request header
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the key is blank (treated as "no credential")
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
