//! Clock and score assembly
//!
//! Turns per-region readings into the strings shown on the broadcast graphic.

pub mod assembler;
pub mod format;

pub use assembler::{
    separator_present, ClockLayout, ClockState, FrameReadings, ScoreLayout, ScoreboardLayout,
    DEFAULT_BLANK_MARKER, DEFAULT_UNKNOWN_MARKER,
};
pub use format::ClockFormat;
