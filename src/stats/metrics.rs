//! Statistics for the pipeline and the broadcast hub

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::hub::PublishReport;

/// Pipeline counters shared between the runner thread and its owner
///
/// The runner updates the atomics; [`PipelineCounters::snapshot`] gives a
/// consistent-enough copy for logging and display.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    frames_processed: AtomicU64,
    missed_frames: AtomicU64,
    unrecognized_readings: AtomicU64,
    messages_published: AtomicU64,
    last_iteration_micros: AtomicU64,
}

impl PipelineCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fully processed frame
    pub fn record_frame(&self, elapsed: Duration, unrecognized: u64) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
        self.unrecognized_readings
            .fetch_add(unrecognized, Ordering::Relaxed);
        self.last_iteration_micros.store(
            u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            Ordering::Relaxed,
        );
    }

    /// Record a cycle where the source had no frame
    pub fn record_miss(&self) {
        self.missed_frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a message handed to the hub
    pub fn record_publish(&self) {
        self.messages_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values
    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            missed_frames: self.missed_frames.load(Ordering::Relaxed),
            unrecognized_readings: self.unrecognized_readings.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            last_iteration: Duration::from_micros(
                self.last_iteration_micros.load(Ordering::Relaxed),
            ),
        }
    }
}

/// Pipeline statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames read, recognized and assembled
    pub frames_processed: u64,
    /// Cycles where the source returned no frame
    pub missed_frames: u64,
    /// Raw digit readings that matched no template
    pub unrecognized_readings: u64,
    /// Messages handed to the hub
    pub messages_published: u64,
    /// Processing time of the last frame, excluding the pacing wait
    pub last_iteration: Duration,
}

impl PipelineStats {
    /// Share of read attempts that produced a frame
    pub fn hit_ratio(&self) -> f64 {
        let attempts = self.frames_processed + self.missed_frames;
        if attempts > 0 {
            self.frames_processed as f64 / attempts as f64
        } else {
            0.0
        }
    }
}

/// Broadcast hub statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Currently registered subscribers
    pub subscribers: usize,
    /// Messages published
    pub messages_published: u64,
    /// Payloads queued across all subscribers
    pub deliveries: u64,
    /// Subscribers dropped on publish or by housekeeping
    pub dropped_subscribers: u64,
}

impl HubStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in the result of one publish
    pub fn record_publish(&mut self, report: &PublishReport) {
        self.messages_published += 1;
        self.deliveries += report.delivered as u64;
        self.dropped_subscribers += report.dropped as u64;
    }
}
