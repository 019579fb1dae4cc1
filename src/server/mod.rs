//! Network transport
//!
//! WebSocket delivery of scoreboard updates and a static asset listener for
//! the display page.

pub mod assets;
pub mod config;
pub mod connection;
pub mod listener;

pub use config::{ServerConfig, DEFAULT_HTTP_PORT, DEFAULT_WS_PORT};
pub use listener::ScoreboardServer;
