//! Main Application
//!
//! The App drives the terminal surface as a thin client:
//! - terminal events (keys, resize) become operator commands
//! - view updates from the engine trigger a redraw
//! - everything else happens inside the [`DisplayClient`]
//!
//! Headless mode skips the terminal entirely and logs each view change,
//! which is how the wall runs under a supervisor without a TTY.

use std::io;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};

use lookbook_core::ViewModel;

use crate::client::DisplayClient;
use crate::render;

/// Redraw at least this often so resizes and status stay fresh
const FRAME_INTERVAL: Duration = Duration::from_millis(250);

/// What an operator key press asks for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Leave the application
    Quit,
    /// Replace the channel connection now
    Reconnect,
    /// Refetch the manifest and probe assets again
    Reload,
    /// Show or hide the debug strip
    ToggleDebug,
}

/// Map a key press to a command
#[must_use]
pub fn command_for(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char('r') => Some(Command::Reconnect),
        KeyCode::Char('l') => Some(Command::Reload),
        KeyCode::Char('d') | KeyCode::F(12) => Some(Command::ToggleDebug),
        _ => None,
    }
}

/// Terminal surface state
pub struct App {
    client: DisplayClient,
    running: bool,
    show_debug: bool,
}

impl App {
    /// Create an App around a configured client
    #[must_use]
    pub fn new(client: DisplayClient) -> Self {
        Self {
            client,
            running: true,
            show_debug: true,
        }
    }

    /// Main event loop
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();
        let mut view = self.client.view();

        self.client.start();
        let initial = view.borrow_and_update().clone();
        self.render(terminal, &initial)?;

        while self.running {
            tokio::select! {
                biased;

                maybe_event = event_stream.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        if let Some(command) = command_for(key) {
                            self.execute(command).await;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "Terminal event error");
                    }
                    None => self.running = false,
                },

                changed = view.changed() => {
                    if changed.is_err() {
                        warn!("Display engine stopped unexpectedly");
                        self.running = false;
                    }
                }

                () = tokio::time::sleep(FRAME_INTERVAL) => {}
            }

            let snapshot = view.borrow_and_update().clone();
            self.render(terminal, &snapshot)?;
        }

        self.client.shutdown().await;
        Ok(())
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::Quit => self.running = false,
            Command::Reconnect => {
                self.client.reconnect();
            }
            Command::Reload => {
                if let Err(e) = self.client.reload().await {
                    warn!(error = %e, "Reload request failed");
                }
            }
            Command::ToggleDebug => self.show_debug = !self.show_debug,
        }
    }

    fn render(
        &self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        view: &ViewModel,
    ) -> anyhow::Result<()> {
        terminal.draw(|frame| render::draw(frame, view, self.show_debug))?;
        Ok(())
    }
}

/// Run without a terminal until Ctrl-C, logging every view change
pub async fn run_headless(mut client: DisplayClient) -> anyhow::Result<()> {
    let mut view = client.view();
    client.start();
    info!("Running headless; press Ctrl-C to stop");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!(error = %e, "Could not listen for Ctrl-C");
                }
                break;
            }
            changed = view.changed() => {
                if changed.is_err() {
                    warn!("Display engine stopped unexpectedly");
                    break;
                }
                let snapshot = view.borrow_and_update().clone();
                log_view(&snapshot);
            }
        }
    }

    client.shutdown().await;
    Ok(())
}

fn log_view(view: &ViewModel) {
    info!(
        mode = view.mode.as_str(),
        connectivity = view.connectivity.as_str(),
        phase = ?view.phase,
        head = ?view.head,
        slots = %render::debug_line(view),
        "View updated"
    );
}
