//! Broadcast hub for scoreboard updates
//!
//! The hub fans every assembled update out to all connected display pages.
//! It runs as a single tokio task that owns the subscriber set; the pipeline
//! and the network listeners only hold a [`HubHandle`].
//!
//! # Architecture
//!
//! ```text
//!   [Pipeline thread]            [WebSocket session]     [WebSocket session]
//!   handle.publish(msg)          handle.subscribe(id)    handle.subscribe(id)
//!          │                            │                       │
//!          └──────────► unbounded command channel ◄─────────────┘
//!                                  │
//!                                  ▼
//!                         BroadcastHub task
//!                  ┌──────────────────────────────┐
//!                  │ SubscriberSet {              │
//!                  │   id → mpsc::Sender<Bytes>,  │
//!                  │   last_payload,              │
//!                  │ }                            │
//!                  └──────────────┬───────────────┘
//!                        serialize once, try_send
//!                  ┌──────────────┴───────────────┐
//!                  ▼                              ▼
//!           queue → text frame             queue → text frame
//! ```
//!
//! `bytes::Bytes` is reference-counted, so every subscriber queue shares the
//! same serialized payload.

pub mod config;
pub mod error;
pub mod message;
pub mod store;
pub mod subscriber;

pub use config::HubConfig;
pub use error::HubError;
pub use message::{GameMessage, ScoreboardMessage, TeamInfo, TeamMessage};
pub use store::{BroadcastHub, HubHandle};
pub use subscriber::{PublishReport, SubscriberId, SubscriberSet};
