//! Theme and Colors
//!
//! A muted gallery palette: the wall shows clothes, the chrome stays quiet.

use ratatui::style::{Color, Modifier, Style};

use lookbook_core::{Connectivity, Mode};

/// Cell borders
pub const BORDER: Color = Color::Rgb(90, 90, 100);

/// Slot labels in the cell titles
pub const LABEL: Color = Color::Rgb(150, 150, 165);

/// Filenames and resolved assets
pub const ASSET: Color = Color::Rgb(235, 235, 240);

/// Empty slots
pub const EMPTY: Color = Color::Rgb(80, 80, 90);

/// Accent for the session head and mode badge
pub const SESSION: Color = Color::Rgb(255, 150, 120);

/// Idle mode badge
pub const IDLE: Color = Color::Rgb(150, 180, 255);

/// Channel up
pub const CONNECTED: Color = Color::Rgb(120, 220, 140);

/// Channel handshaking
pub const CONNECTING: Color = Color::Rgb(255, 223, 128);

/// Channel down
pub const DISCONNECTED: Color = Color::Rgb(255, 100, 100);

/// Status bar background
pub const STATUS_BG: Color = Color::Rgb(30, 30, 36);

/// Color of the connectivity indicator
#[must_use]
pub fn connectivity_color(connectivity: Connectivity) -> Color {
    match connectivity {
        Connectivity::Connected => CONNECTED,
        Connectivity::Connecting => CONNECTING,
        Connectivity::Disconnected => DISCONNECTED,
    }
}

/// Style of the mode badge
#[must_use]
pub fn mode_style(mode: Mode) -> Style {
    let color = match mode {
        Mode::Idle => IDLE,
        Mode::Session => SESSION,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}
