//! Pipeline state machine
//!
//! Tracks the pipeline from creation through running to stop or failure.
//! Shared between the controller and the runner thread.

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Pipeline lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// Created or reset, not running
    Idle,
    /// Runner thread active
    Running,
    /// Stopped on request
    Stopped,
    /// Stopped by a fatal frame source error; needs an explicit restart
    Failed,
}

impl PipelinePhase {
    /// Whether `start` is allowed from this phase
    pub fn can_start(&self) -> bool {
        !matches!(self, PipelinePhase::Running)
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelinePhase::Idle => "idle",
            PipelinePhase::Running => "running",
            PipelinePhase::Stopped => "stopped",
            PipelinePhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Complete pipeline state
#[derive(Debug)]
pub struct PipelineState {
    /// Current phase
    pub phase: PipelinePhase,

    /// When the current or last run started
    pub started_at: Option<Instant>,

    /// When the last run ended
    pub ended_at: Option<Instant>,

    /// Reason of the last failure
    pub last_error: Option<String>,
}

impl PipelineState {
    /// Create an idle state
    pub fn new() -> Self {
        Self {
            phase: PipelinePhase::Idle,
            started_at: None,
            ended_at: None,
            last_error: None,
        }
    }

    /// Return to idle before a restart
    pub fn reset(&mut self) {
        if self.phase != PipelinePhase::Running {
            self.phase = PipelinePhase::Idle;
            self.last_error = None;
        }
    }

    /// Transition idle to running
    pub fn start(&mut self) -> bool {
        if self.phase == PipelinePhase::Idle {
            self.phase = PipelinePhase::Running;
            self.started_at = Some(Instant::now());
            self.ended_at = None;
            true
        } else {
            false
        }
    }

    /// Transition running to stopped
    pub fn stop(&mut self) {
        if self.phase == PipelinePhase::Running {
            self.phase = PipelinePhase::Stopped;
            self.ended_at = Some(Instant::now());
        }
    }

    /// Enter the failed phase
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.phase = PipelinePhase::Failed;
        self.ended_at = Some(Instant::now());
        self.last_error = Some(reason.into());
    }

    /// Check if the pipeline is running
    pub fn is_running(&self) -> bool {
        self.phase == PipelinePhase::Running
    }

    /// Duration of the current or last run
    pub fn uptime(&self) -> Duration {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

/// Lock shared state, recovering it if a holder panicked
pub(crate) fn lock(state: &Mutex<PipelineState>) -> MutexGuard<'_, PipelineState> {
    state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
