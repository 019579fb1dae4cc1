//! scorecast
//!
//! Reads the game clock, shot clock and scores off a video feed of an LED
//! scoreboard and pushes every recognized frame to connected display pages
//! over WebSocket.
//!
//! # Architecture
//!
//! ```text
//!   FrameSource ──► PreparedFrame ──► classify ──► FilterBank ──► ScoreboardLayout
//!   (camera,        (crop, rotate,    (templates)  (vote +        (clock, shot clock,
//!    recording)      hue mask)                     transitions)    scores)
//!                                                                      │
//!                                                       ScoreboardMessage (JSON)
//!                                                                      │
//!                                                                      ▼
//!                                               BroadcastHub ──► WebSocket clients
//! ```
//!
//! The recognition [`Pipeline`] runs on its own thread. The
//! [`ScoreboardServer`] owns the [`hub::BroadcastHub`] and the accept loops;
//! the pipeline only holds a [`hub::HubHandle`] and never blocks on a slow
//! subscriber.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use scorecast::vision::{ImageSequenceOpener, TemplateLibrary};
//! use scorecast::{Pipeline, ScoreboardConfig, ScoreboardServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> scorecast::Result<()> {
//!     let server = ScoreboardServer::new(ServerConfig::default());
//!     let (mut pipeline, _events) = Pipeline::new(
//!         ImageSequenceOpener::new("recordings/game1", true),
//!         Arc::new(TemplateLibrary::builtin()),
//!         server.hub(),
//!     );
//!
//!     pipeline.start(ScoreboardConfig::load("scoreboard.json")?)?;
//!     server
//!         .run_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     pipeline.stop();
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod hub;
pub mod pipeline;
pub mod server;
pub mod stats;
pub mod vision;

pub use clock::ClockState;
pub use config::ScoreboardConfig;
pub use error::{Error, Result};
pub use hub::{HubHandle, ScoreboardMessage, TeamInfo};
pub use pipeline::{Pipeline, PipelineEvent, PipelinePhase};
pub use server::{ScoreboardServer, ServerConfig};
