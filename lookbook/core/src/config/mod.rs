//! Configuration
//!
//! Layered configuration for the display, read from
//! `$XDG_CONFIG_HOME/lookbook/display.toml`.
//!
//! # Priority
//!
//! Highest first:
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! base_url = "http://localhost:3001"
//! manifest_path = "/outfits"
//! asset_path = "/public/outfits"
//! api_key = "wall-secret"
//!
//! [channel]
//! transport = "sse"
//! events_path = "/events"
//! retry_delay_ms = 5000
//! connect_timeout_ms = 10000
//!
//! [display]
//! refresh_interval_ms = 10000
//! default_head = "Head_Default_animated.gif"
//! logo_left = "Logo_Left_static.png"
//! logo_right = "Logo_Right_static.png"
//! ```
//!
//! # Environment
//!
//! `LOOKBOOK_BACKEND_URL`, `LOOKBOOK_API_KEY`, `LOOKBOOK_TRANSPORT`,
//! `LOOKBOOK_RETRY_DELAY_MS`, `LOOKBOOK_REFRESH_INTERVAL_MS`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assets::FixedAssetNames;
use crate::auth::ApiKey;
use crate::channel::{ChannelConfig, TransportType};

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Where the highest-priority value in the configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Command-line argument
    Cli,
    /// Environment variable
    Env,
    /// TOML configuration file
    File,
    /// Built-in default
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Structures
// =============================================================================

/// `[backend]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Backend base URL
    pub base_url: Option<String>,
    /// Manifest path
    pub manifest_path: Option<String>,
    /// Static asset path
    pub asset_path: Option<String>,
    /// Shared secret
    pub api_key: Option<ApiKey>,
    /// Per-request timeout for manifest and asset fetches
    pub request_timeout_ms: Option<u64>,
}

/// `[channel]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelToml {
    /// `sse` or `websocket`
    pub transport: Option<TransportType>,
    /// Event endpoint path
    pub events_path: Option<String>,
    /// Delay before reconnecting
    pub retry_delay_ms: Option<u64>,
    /// Connect timeout
    pub connect_timeout_ms: Option<u64>,
}

/// `[display]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayToml {
    /// Idle refresh cadence
    pub refresh_interval_ms: Option<u64>,
    /// Default head animation filename
    pub default_head: Option<String>,
    /// Left logo filename
    pub logo_left: Option<String>,
    /// Right logo filename
    pub logo_right: Option<String>,
}

/// Root of the TOML file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LookbookToml {
    /// Backend endpoints and credentials
    pub backend: BackendToml,
    /// Real-time channel
    pub channel: ChannelToml,
    /// Presentation timing and fixed assets
    pub display: DisplayToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Backend endpoints and credentials
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL, e.g. `http://localhost:3001`
    pub base_url: String,
    /// Manifest path (`/outfits` or `/api/outfits`)
    pub manifest_path: String,
    /// Static asset path
    pub asset_path: String,
    /// Shared secret sent as `x-api-key`
    pub api_key: Option<ApiKey>,
    /// Per-request timeout for manifest and asset fetches
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            manifest_path: "/outfits".to_string(),
            asset_path: "/public/outfits".to_string(),
            api_key: None,
            request_timeout_ms: 10_000,
        }
    }
}

impl BackendConfig {
    /// Join `path` onto the base URL
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Manifest URL
    #[must_use]
    pub fn manifest_url(&self) -> String {
        self.endpoint(&self.manifest_path)
    }

    /// Base URL assets resolve under
    #[must_use]
    pub fn asset_base_url(&self) -> String {
        self.endpoint(&self.asset_path)
    }

    /// Request timeout as a [`Duration`]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Presentation timing and fixed asset names
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Idle refresh cadence
    pub refresh_interval_ms: u64,
    /// Default head animation filename
    pub default_head: String,
    /// Left logo filename
    pub logo_left: String,
    /// Right logo filename
    pub logo_right: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let fixed = FixedAssetNames::default();
        Self {
            refresh_interval_ms: 10_000,
            default_head: fixed.default_head,
            logo_left: fixed.logo_left,
            logo_right: fixed.logo_right,
        }
    }
}

impl DisplayConfig {
    /// Refresh cadence as a [`Duration`]
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Names of the fixed assets for the cache
    #[must_use]
    pub fn fixed_assets(&self) -> FixedAssetNames {
        FixedAssetNames {
            logo_left: self.logo_left.clone(),
            logo_right: self.logo_right.clone(),
            default_head: self.default_head.clone(),
        }
    }
}

/// Fully resolved configuration
#[derive(Clone, Debug)]
pub struct LookbookConfig {
    /// Backend endpoints and credentials
    pub backend: BackendConfig,
    /// Real-time channel
    pub channel: ChannelConfig,
    /// Presentation timing and fixed assets
    pub display: DisplayConfig,
    /// Path of the file that was loaded, if any
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for LookbookConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            channel: ChannelConfig::default(),
            display: DisplayConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl LookbookConfig {
    /// Configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest-priority source that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Event endpoint URL
    #[must_use]
    pub fn events_url(&self) -> String {
        self.backend.endpoint(&self.channel.events_path)
    }

    /// Check values that would make the display unusable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.backend.base_url.as_str();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "backend.base_url must be an http(s) URL, got {base:?}"
            )));
        }
        if self.display.refresh_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "display.refresh_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.channel.retry_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "channel.retry_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.channel.connect_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "channel.connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.backend.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "backend.request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.display.default_head.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "display.default_head must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Default configuration file path
///
/// `$XDG_CONFIG_HOME/lookbook/display.toml`, typically
/// `~/.config/lookbook/display.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lookbook").join("display.toml"))
}

/// Load configuration from the default path, then the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed,
/// or if the result fails validation. A missing file is not an error.
pub fn load_config() -> Result<LookbookConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then the environment
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the result
/// fails validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<LookbookConfig, ConfigError> {
    let mut config = load_file_layer(path)?;
    apply_env_config(&mut config, |name| std::env::var(name).ok());
    config.validate()?;
    Ok(config)
}

fn load_file_layer(path: Option<PathBuf>) -> Result<LookbookConfig, ConfigError> {
    let mut config = LookbookConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: LookbookToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(path = %config_path.display(), "Config file not found, using defaults");
        }
    }

    Ok(config)
}

fn apply_toml_config(config: &mut LookbookConfig, toml: &LookbookToml) {
    let backend = &toml.backend;
    if let Some(ref url) = backend.base_url {
        config.backend.base_url.clone_from(url);
    }
    if let Some(ref path) = backend.manifest_path {
        config.backend.manifest_path.clone_from(path);
    }
    if let Some(ref path) = backend.asset_path {
        config.backend.asset_path.clone_from(path);
    }
    if backend.api_key.is_some() {
        config.backend.api_key.clone_from(&backend.api_key);
    }
    if let Some(timeout) = backend.request_timeout_ms {
        config.backend.request_timeout_ms = timeout;
    }

    let channel = &toml.channel;
    if let Some(transport) = channel.transport {
        config.channel.transport = transport;
    }
    if let Some(ref path) = channel.events_path {
        config.channel.events_path.clone_from(path);
    }
    if let Some(delay) = channel.retry_delay_ms {
        config.channel.retry_delay_ms = delay;
    }
    if let Some(timeout) = channel.connect_timeout_ms {
        config.channel.connect_timeout_ms = timeout;
    }

    let display = &toml.display;
    if let Some(interval) = display.refresh_interval_ms {
        config.display.refresh_interval_ms = interval;
    }
    if let Some(ref name) = display.default_head {
        config.display.default_head.clone_from(name);
    }
    if let Some(ref name) = display.logo_left {
        config.display.logo_left.clone_from(name);
    }
    if let Some(ref name) = display.logo_right {
        config.display.logo_right.clone_from(name);
    }
}

/// Apply `LOOKBOOK_*` variables, looked up through `var`
fn apply_env_config<F>(config: &mut LookbookConfig, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = var("LOOKBOOK_BACKEND_URL") {
        config.backend.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(key) = var("LOOKBOOK_API_KEY") {
        config.backend.api_key = Some(ApiKey::new(key));
        config.source = ConfigSource::Env;
    }
    if let Some(name) = var("LOOKBOOK_TRANSPORT") {
        match TransportType::parse(&name) {
            Some(transport) => {
                config.channel.transport = transport;
                config.source = ConfigSource::Env;
            }
            None => tracing::warn!(value = %name, "Ignoring unknown LOOKBOOK_TRANSPORT"),
        }
    }
    if let Some(ms) = env_millis(&var, "LOOKBOOK_RETRY_DELAY_MS") {
        config.channel.retry_delay_ms = ms;
        config.source = ConfigSource::Env;
    }
    if let Some(ms) = env_millis(&var, "LOOKBOOK_REFRESH_INTERVAL_MS") {
        config.display.refresh_interval_ms = ms;
        config.source = ConfigSource::Env;
    }
}

/// Millisecond value of `name`; unparsable values are logged and skipped
fn env_millis<F>(var: &F, name: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let value = var(name)?;
    match value.trim().parse() {
        Ok(ms) => Some(ms),
        Err(e) => {
            tracing::warn!(variable = name, value = %value, error = %e, "Ignoring unparsable duration");
            None
        }
    }
}

// =============================================================================
// CLI Overrides
// =============================================================================

/// Values supplied on the command line
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend base URL
    pub backend_url: Option<String>,
    /// Shared secret
    pub api_key: Option<ApiKey>,
    /// Transport
    pub transport: Option<TransportType>,
    /// Retry delay
    pub retry_delay_ms: Option<u64>,
    /// Idle refresh cadence
    pub refresh_interval_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the backend URL
    #[must_use]
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Override the shared secret
    #[must_use]
    pub fn with_api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Override the transport
    #[must_use]
    pub fn with_transport(mut self, transport: TransportType) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Override the retry delay
    #[must_use]
    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = Some(ms);
        self
    }

    /// Override the refresh cadence
    #[must_use]
    pub fn with_refresh_interval_ms(mut self, ms: u64) -> Self {
        self.refresh_interval_ms = Some(ms);
        self
    }

    fn is_empty(&self) -> bool {
        self.backend_url.is_none()
            && self.api_key.is_none()
            && self.transport.is_none()
            && self.retry_delay_ms.is_none()
            && self.refresh_interval_ms.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut LookbookConfig) {
        if self.is_empty() {
            return;
        }
        config.source = ConfigSource::Cli;

        if let Some(ref url) = self.backend_url {
            config.backend.base_url.clone_from(url);
        }
        if self.api_key.is_some() {
            config.backend.api_key.clone_from(&self.api_key);
        }
        if let Some(transport) = self.transport {
            config.channel.transport = transport;
        }
        if let Some(ms) = self.retry_delay_ms {
            config.channel.retry_delay_ms = ms;
        }
        if let Some(ms) = self.refresh_interval_ms {
            config.display.refresh_interval_ms = ms;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
