//! Pipeline runner
//!
//! The recognition loop runs on a dedicated OS thread: frame reads block and
//! the image work is CPU-bound. Each iteration takes the latest configuration
//! snapshot, reads a frame, recognizes every region, publishes the assembled
//! state and then waits out the pacing interval. The wait doubles as the stop
//! check, so `stop` interrupts it immediately.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use image::RgbImage;
use tokio::sync::{mpsc, watch};

use super::state::{lock, PipelineState};
use super::PipelineEvent;
use crate::clock::{ClockState, FrameReadings};
use crate::config::ScoreboardConfig;
use crate::filter::FilterBank;
use crate::hub::{HubHandle, ScoreboardMessage};
use crate::stats::PipelineCounters;
use crate::vision::{classify, FrameSource, PreparedFrame, Reading, TemplateLibrary};

/// Result of recognizing one frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    /// Assembled display strings
    pub state: ClockState,
    /// Stabilized digit readings and separator intensities
    pub readings: FrameReadings,
    /// Raw digit readings that matched no template
    pub unrecognized: u64,
}

/// Recognize every configured region of one frame
///
/// Runs the region-independent preprocessing once, classifies and stabilizes
/// each digit region, measures each separator and assembles the displays.
pub fn process_frame(
    frame: &RgbImage,
    config: &ScoreboardConfig,
    templates: &TemplateLibrary,
    filters: &mut FilterBank,
) -> FrameOutcome {
    let prepared = PreparedFrame::prepare(frame, &config.preprocess);
    let mut readings = FrameReadings::new();
    let mut unrecognized = 0;

    for region in config.digit_regions() {
        let glyph = prepared.glyph(&region.rect, &config.preprocess);
        let raw = classify(&glyph, templates);
        if raw == Reading::Unrecognized {
            unrecognized += 1;
            tracing::trace!(region = %region.key, glyph = ?glyph, "Unrecognized glyph");
        }
        let stable = filters.observe(&region.key, raw);
        readings.set_digit(region.key.clone(), stable);
    }

    for region in config.separator_regions() {
        let intensity = prepared.separator_intensity(&region.rect);
        readings.set_separator(region.key.clone(), intensity);
    }

    let state = config
        .layout
        .assemble(&readings, config.separator_threshold);

    FrameOutcome {
        state,
        readings,
        unrecognized,
    }
}

enum Exit {
    Stopped,
    Failed(String),
}

/// Owns everything the recognition thread touches
pub(crate) struct Runner {
    pub(crate) source: Option<Box<dyn FrameSource>>,
    pub(crate) templates: Arc<TemplateLibrary>,
    pub(crate) hub: HubHandle,
    pub(crate) config_rx: watch::Receiver<Arc<ScoreboardConfig>>,
    pub(crate) stop_rx: Receiver<()>,
    pub(crate) events: mpsc::UnboundedSender<PipelineEvent>,
    pub(crate) state: Arc<Mutex<PipelineState>>,
    pub(crate) counters: Arc<PipelineCounters>,
}

impl Runner {
    /// Run until stopped or the source fails
    pub(crate) fn run(mut self) {
        let description = self
            .source
            .as_ref()
            .map(|s| s.describe())
            .unwrap_or_default();
        tracing::info!(source = %description, "Pipeline running");

        // A panic in a frame source or in recognition ends the run as a failure
        let exit = panic::catch_unwind(AssertUnwindSafe(|| self.run_loop()))
            .unwrap_or_else(|payload| Exit::Failed(panic_reason(payload.as_ref())));

        // Release the device before anyone hears about the exit
        drop(self.source.take());

        let event = match exit {
            Exit::Stopped => {
                lock(&self.state).stop();
                tracing::info!(source = %description, "Pipeline stopped");
                PipelineEvent::Stopped
            }
            Exit::Failed(reason) => {
                lock(&self.state).fail(reason.clone());
                tracing::error!(source = %description, error = %reason, "Pipeline failed");
                PipelineEvent::Failed(reason)
            }
        };
        let _ = self.events.send(event);
    }

    fn run_loop(&mut self) -> Exit {
        let mut config = Arc::clone(&self.config_rx.borrow());
        let mut filters = FilterBank::from_config(&config);

        loop {
            match self.stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => return Exit::Stopped,
                Err(TryRecvError::Empty) => {}
            }

            // Pick up a new snapshot, if any
            let latest = Arc::clone(&self.config_rx.borrow());
            if !Arc::ptr_eq(&latest, &config) {
                config = latest;
                filters.sync(&config);
                tracing::info!(regions = config.regions.len(), "Configuration updated");
            }

            let Some(source) = self.source.as_mut() else {
                return Exit::Failed("frame source released".to_string());
            };

            let started = Instant::now();
            match source.read_frame() {
                Ok(Some(frame)) => {
                    let outcome = process_frame(&frame, &config, &self.templates, &mut filters);
                    self.counters
                        .record_frame(started.elapsed(), outcome.unrecognized);

                    let message = ScoreboardMessage::from_state(&outcome.state, &config);
                    if self.hub.publish(message) {
                        self.counters.record_publish();
                    } else {
                        tracing::warn!("Broadcast hub closed, update dropped");
                    }

                    tracing::trace!(
                        clock = %outcome.state.clock,
                        shot_clock = %outcome.state.shot_clock,
                        "Frame recognized"
                    );
                    let _ = self.events.send(PipelineEvent::Frame(outcome.state));
                }
                Ok(None) => {
                    self.counters.record_miss();
                    tracing::trace!("No frame this cycle");
                }
                Err(e) => return Exit::Failed(e.to_string()),
            }

            match self.stop_rx.recv_timeout(config.pacing_interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return Exit::Stopped,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("pipeline thread panicked: {}", message)
}
