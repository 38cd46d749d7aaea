//! Lookbook Display - Terminal surface for the lookbook wall
//!
//! Renders the engine's view model as a 3x3 grid with a status bar. All
//! session logic lives in `lookbook-core`; this crate only draws.
//!
//! # Architecture
//!
//! - **Client**: assembles loader, channel and engine from configuration
//! - **App**: terminal event loop and headless runner
//! - **Render**: pure drawing of a view model
//! - **Theme**: colors

pub mod app;
pub mod client;
pub mod render;
pub mod theme;

pub use app::{run_headless, App};
pub use client::DisplayClient;
