//! Recognition pipeline
//!
//! Drives frame source → preprocessing → classification → filtering →
//! assembly → hub on a dedicated thread at a configurable pace.

pub mod controller;
pub mod runner;
pub mod state;

pub use controller::Pipeline;
pub use runner::{process_frame, FrameOutcome};
pub use state::{PipelinePhase, PipelineState};

use crate::clock::ClockState;

/// Events from the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Runner thread started
    Started,

    /// A frame was recognized and published
    Frame(ClockState),

    /// Stopped on request
    Stopped,

    /// Stopped by a fatal error
    Failed(String),
}
