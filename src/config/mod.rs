//! Scoreboard configuration
//!
//! Region definitions and the immutable configuration snapshot handed to the
//! pipeline.

pub mod region;
pub mod snapshot;

pub use region::{Rect, Region, RegionKey, RegionMode};
pub use snapshot::{
    default_transitions, ScoreboardConfig, DEFAULT_PACING_INTERVAL, DEFAULT_SEPARATOR_THRESHOLD,
    MAX_CROP_OFFSET,
};
