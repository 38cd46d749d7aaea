//! Lookbook Display Entry Point
//!
//! # Usage
//!
//! ```bash
//! # Defaults, or ~/.config/lookbook/display.toml when present
//! lookbook-display
//!
//! # Point at another backend over WebSocket
//! lookbook-display --backend-url https://wall.example --transport websocket
//!
//! # No terminal; log view changes to stderr
//! RUST_LOG=debug lookbook-display --headless
//! ```

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;

use lookbook_core::{load_config_from_path, default_config_path, ApiKey, ConfigOverrides, TransportType};
use lookbook_display::{run_headless, App, DisplayClient};

/// Lookbook Display - session-synchronized outfit wall
#[derive(Parser, Debug)]
#[command(name = "lookbook-display")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "LOOKBOOK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, value_name = "URL")]
    backend_url: Option<String>,

    /// Shared secret sent as x-api-key
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Channel transport (sse, websocket)
    #[arg(long, value_name = "TRANSPORT", value_parser = parse_transport)]
    transport: Option<TransportType>,

    /// Delay before reconnecting a dropped channel
    #[arg(long, value_name = "MS")]
    retry_delay_ms: Option<u64>,

    /// Idle refresh cadence
    #[arg(long, value_name = "MS")]
    refresh_interval_ms: Option<u64>,

    /// Run without a terminal, logging view changes to stderr
    #[arg(long)]
    headless: bool,

    /// Log file used while the terminal is owned by the display
    #[arg(long, value_name = "FILE", default_value = "lookbook-display.log")]
    log_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "LOOKBOOK_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

fn parse_transport(value: &str) -> Result<TransportType, String> {
    TransportType::parse(value).ok_or_else(|| format!("unknown transport '{value}'"))
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(url) = &self.backend_url {
            overrides = overrides.with_backend_url(url.clone());
        }
        if let Some(key) = &self.api_key {
            overrides = overrides.with_api_key(ApiKey::new(key.clone()));
        }
        if let Some(transport) = self.transport {
            overrides = overrides.with_transport(transport);
        }
        if let Some(ms) = self.retry_delay_ms {
            overrides = overrides.with_retry_delay_ms(ms);
        }
        if let Some(ms) = self.refresh_interval_ms {
            overrides = overrides.with_refresh_interval_ms(ms);
        }
        overrides
    }
}

/// Initialize logging: stderr when headless, otherwise a file
fn init_logging(level: &str, headless: bool, log_file: &Path) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "lookbook_display={level},lookbook_core={level}"
        ))
    });

    if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(io::stderr)
            .init();
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .with_context(|| format!("Failed to open log file: {}", log_file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.headless, &args.log_file)?;

    let mut config = load_config_from_path(args.config.clone().or_else(default_config_path))
        .context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(version = env!("CARGO_PKG_VERSION"), "Lookbook display starting");

    let client = DisplayClient::new(&config)?;

    if args.headless {
        return run_headless(client).await;
    }

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        anyhow::bail!("lookbook-display needs a terminal; use --headless to run without one");
    }

    // Restore the terminal before the default hook prints the panic
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let result = App::new(client).run(&mut terminal).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
