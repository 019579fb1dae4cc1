//! Pipeline controller
//!
//! Owner-facing API: start, stop, configuration updates and lifecycle events.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tokio::sync::{mpsc, watch};

use super::runner::Runner;
use super::state::{lock, PipelinePhase, PipelineState};
use super::PipelineEvent;
use crate::config::ScoreboardConfig;
use crate::error::{Error, Result};
use crate::hub::HubHandle;
use crate::stats::{PipelineCounters, PipelineStats};
use crate::vision::{FrameSourceOpener, TemplateLibrary};

/// The recognition pipeline
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
///
/// use scorecast::config::ScoreboardConfig;
/// use scorecast::pipeline::Pipeline;
/// use scorecast::server::{ScoreboardServer, ServerConfig};
/// use scorecast::vision::{ImageSequenceOpener, TemplateLibrary};
///
/// # async fn example() -> scorecast::Result<()> {
/// let server = ScoreboardServer::new(ServerConfig::default());
/// let opener = ImageSequenceOpener::new("recordings/game1", true);
/// let (mut pipeline, mut events) =
///     Pipeline::new(opener, Arc::new(TemplateLibrary::builtin()), server.hub());
///
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         println!("Event: {:?}", event);
///     }
/// });
///
/// pipeline.start(ScoreboardConfig::load("scoreboard.json")?)?;
/// server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
/// pipeline.stop();
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    opener: Arc<dyn FrameSourceOpener>,
    templates: Arc<TemplateLibrary>,
    hub: HubHandle,
    state: Arc<Mutex<PipelineState>>,
    counters: Arc<PipelineCounters>,
    events: mpsc::UnboundedSender<PipelineEvent>,
    config_tx: Option<watch::Sender<Arc<ScoreboardConfig>>>,
    stop_tx: Option<crossbeam_channel::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Create a new pipeline.
    ///
    /// Returns the pipeline and a receiver for lifecycle events.
    pub fn new(
        opener: impl FrameSourceOpener,
        templates: Arc<TemplateLibrary>,
        hub: HubHandle,
    ) -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let pipeline = Self {
            opener: Arc::new(opener),
            templates,
            hub,
            state: Arc::new(Mutex::new(PipelineState::new())),
            counters: Arc::new(PipelineCounters::new()),
            events: tx,
            config_tx: None,
            stop_tx: None,
            worker: None,
        };

        (pipeline, rx)
    }

    /// Open the frame source and start the runner thread
    ///
    /// Allowed from `Idle`, `Stopped` and `Failed`. If the source cannot be
    /// opened the pipeline enters `Failed` and the error is returned.
    pub fn start(&mut self, config: ScoreboardConfig) -> Result<()> {
        if !self.phase().can_start() {
            return Err(Error::Pipeline("pipeline already running".into()));
        }

        // A failed runner has already exited; reap it
        self.join_worker();
        lock(&self.state).reset();

        let device_index = config.capture_device_index;
        let source = match self.opener.open(device_index) {
            Ok(source) => source,
            Err(e) => {
                let reason = e.to_string();
                lock(&self.state).fail(reason.clone());
                tracing::error!(device_index, error = %reason, "Failed to open frame source");
                let _ = self.events.send(PipelineEvent::Failed(reason));
                return Err(e.into());
            }
        };

        let (config_tx, config_rx) = watch::channel(Arc::new(config));
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);

        lock(&self.state).start();
        let _ = self.events.send(PipelineEvent::Started);

        let runner = Runner {
            source: Some(source),
            templates: Arc::clone(&self.templates),
            hub: self.hub.clone(),
            config_rx,
            stop_rx,
            events: self.events.clone(),
            state: Arc::clone(&self.state),
            counters: Arc::clone(&self.counters),
        };

        let worker = std::thread::Builder::new()
            .name("scorecast-pipeline".into())
            .spawn(move || runner.run());

        match worker {
            Ok(worker) => {
                self.worker = Some(worker);
                self.config_tx = Some(config_tx);
                self.stop_tx = Some(stop_tx);
                tracing::info!(device_index, "Pipeline started");
                Ok(())
            }
            Err(e) => {
                lock(&self.state).fail(e.to_string());
                let _ = self.events.send(PipelineEvent::Failed(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Replace the configuration snapshot
    ///
    /// Takes effect on the runner's next iteration. Returns an error when the
    /// pipeline has not been started.
    pub fn update_config(&self, config: ScoreboardConfig) -> Result<()> {
        match &self.config_tx {
            Some(tx) => {
                tx.send_replace(Arc::new(config));
                Ok(())
            }
            None => Err(Error::Pipeline("pipeline not started".into())),
        }
    }

    /// Stop the runner and wait for it to exit
    ///
    /// Idempotent. A failed pipeline stays `Failed`.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        self.join_worker();
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                lock(&self.state).fail("pipeline thread panicked");
                tracing::error!("Pipeline thread panicked");
            }
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> PipelinePhase {
        lock(&self.state).phase
    }

    /// Reason of the last failure
    pub fn last_error(&self) -> Option<String> {
        lock(&self.state).last_error.clone()
    }

    /// The configuration snapshot the runner is using
    pub fn config(&self) -> Option<Arc<ScoreboardConfig>> {
        self.config_tx.as_ref().map(|tx| Arc::clone(&tx.borrow()))
    }

    /// Counters of the current and previous runs
    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use image::RgbImage;

    use super::*;
    use crate::config::{Rect, Region};
    use crate::hub::{BroadcastHub, HubConfig, ScoreboardMessage, SubscriberId};
    use crate::vision::{FnOpener, FrameSource, FrameSourceError, StillFrameSource};

    /// Yields a scripted sequence of results and records when it is dropped
    struct ScriptedSource {
        script: Vec<Option<RgbImage>>,
        position: usize,
        released: Arc<AtomicBool>,
    }

    impl FrameSource for ScriptedSource {
        fn read_frame(&mut self) -> std::result::Result<Option<RgbImage>, FrameSourceError> {
            let next = self.script.get(self.position).cloned();
            self.position += 1;
            match next {
                Some(frame) => Ok(frame),
                None => Err(FrameSourceError::Disconnected("cable pulled".into())),
            }
        }
    }

    impl Drop for ScriptedSource {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    struct PanickingSource;

    impl FrameSource for PanickingSource {
        fn read_frame(&mut self) -> std::result::Result<Option<RgbImage>, FrameSourceError> {
            panic!("decoder state corrupted");
        }
    }

    fn fast_config() -> ScoreboardConfig {
        ScoreboardConfig::default().with_pacing_interval(Duration::from_millis(5))
    }

    fn still_opener() -> impl FrameSourceOpener {
        FnOpener(
            |_| -> std::result::Result<Box<dyn FrameSource>, FrameSourceError> {
                Ok(Box::new(StillFrameSource::new(RgbImage::new(8, 8))))
            },
        )
    }

    async fn next_event(events: &mut mpsc::UnboundedReceiver<PipelineEvent>) -> PipelineEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for pipeline event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_start_stop() {
        let (hub, handle) = BroadcastHub::new(HubConfig::default());
        tokio::spawn(hub.run());

        let (mut pipeline, mut events) =
            Pipeline::new(still_opener(), Arc::new(TemplateLibrary::builtin()), handle);
        assert_eq!(pipeline.phase(), PipelinePhase::Idle);

        pipeline.start(fast_config()).unwrap();
        assert_eq!(pipeline.phase(), PipelinePhase::Running);
        assert!(matches!(next_event(&mut events).await, PipelineEvent::Started));
        assert!(matches!(next_event(&mut events).await, PipelineEvent::Frame(_)));

        // Starting twice is an error
        assert!(matches!(
            pipeline.start(fast_config()),
            Err(Error::Pipeline(_))
        ));

        pipeline.stop();
        pipeline.stop();
        assert_eq!(pipeline.phase(), PipelinePhase::Stopped);
        assert!(pipeline.stats().frames_processed >= 1);

        // Restart from Stopped
        pipeline.start(fast_config()).unwrap();
        assert_eq!(pipeline.phase(), PipelinePhase::Running);
        pipeline.stop();
        assert_eq!(pipeline.phase(), PipelinePhase::Stopped);
    }

    #[tokio::test]
    async fn test_read_error_is_fatal_and_releases_source() {
        let (_hub, handle) = BroadcastHub::new(HubConfig::default());
        let released = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&released);

        let opener = FnOpener(
            move |_| -> std::result::Result<Box<dyn FrameSource>, FrameSourceError> {
                Ok(Box::new(ScriptedSource {
                    script: vec![Some(RgbImage::new(8, 8)), None, None],
                    position: 0,
                    released: Arc::clone(&flag),
                }))
            },
        );

        let (mut pipeline, mut events) =
            Pipeline::new(opener, Arc::new(TemplateLibrary::builtin()), handle);
        pipeline.start(fast_config()).unwrap();

        assert!(matches!(next_event(&mut events).await, PipelineEvent::Started));
        assert!(matches!(next_event(&mut events).await, PipelineEvent::Frame(_)));
        match next_event(&mut events).await {
            PipelineEvent::Failed(reason) => assert!(reason.contains("cable pulled")),
            other => panic!("unexpected event {:?}", other),
        }

        assert!(released.load(Ordering::SeqCst));
        assert_eq!(pipeline.phase(), PipelinePhase::Failed);
        assert!(pipeline.last_error().is_some());

        // Misses were counted, never published
        let stats = pipeline.stats();
        assert_eq!(stats.frames_processed, 1);
        assert_eq!(stats.missed_frames, 2);

        // Stop leaves the failure visible
        pipeline.stop();
        assert_eq!(pipeline.phase(), PipelinePhase::Failed);
    }

    #[tokio::test]
    async fn test_open_failure() {
        let (_hub, handle) = BroadcastHub::new(HubConfig::default());
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let opener = FnOpener(
            move |index| -> std::result::Result<Box<dyn FrameSource>, FrameSourceError> {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FrameSourceError::Unavailable(format!("no device {}", index)))
            },
        );

        let (mut pipeline, mut events) =
            Pipeline::new(opener, Arc::new(TemplateLibrary::builtin()), handle);

        let result = pipeline.start(fast_config().with_capture_device_index(3));
        assert!(matches!(result, Err(Error::FrameSource(_))));
        assert_eq!(pipeline.phase(), PipelinePhase::Failed);
        assert!(matches!(next_event(&mut events).await, PipelineEvent::Failed(_)));

        // Restart from Failed tries again
        assert!(pipeline.start(fast_config()).is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_update_config() {
        let (hub, handle) = BroadcastHub::new(HubConfig::default());
        tokio::spawn(hub.run());

        let (mut pipeline, _events) =
            Pipeline::new(still_opener(), Arc::new(TemplateLibrary::builtin()), handle);

        assert!(pipeline.update_config(fast_config()).is_err());

        pipeline.start(fast_config()).unwrap();
        pipeline
            .update_config(fast_config().with_ticker("Overtime"))
            .unwrap();
        assert_eq!(pipeline.config().unwrap().ticker, "Overtime");

        pipeline.stop();
    }

    /// Wait for a frame event whose clock reads `clock`
    async fn wait_for_clock(events: &mut mpsc::UnboundedReceiver<PipelineEvent>, clock: &str) {
        loop {
            if let PipelineEvent::Frame(state) = next_event(events).await {
                if state.clock == clock {
                    return;
                }
            }
        }
    }

    /// Wait for a hub payload carrying `ticker`
    async fn wait_for_ticker(updates: &mut mpsc::Receiver<bytes::Bytes>, ticker: &str) {
        let found = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(payload) = updates.recv().await {
                let message: ScoreboardMessage = serde_json::from_slice(&payload).unwrap();
                if message.ticker == ticker {
                    return true;
                }
            }
            false
        })
        .await
        .expect("timed out waiting for hub payload");
        assert!(found, "subscriber queue closed");
    }

    #[tokio::test]
    async fn test_running_loop_picks_up_new_config() {
        let (hub, handle) = BroadcastHub::new(HubConfig::default().queue_capacity(4096));
        tokio::spawn(hub.run());
        let mut updates = handle
            .subscribe(SubscriberId::new(1, "127.0.0.1:9000".parse().unwrap()))
            .unwrap();

        let (mut pipeline, mut events) =
            Pipeline::new(still_opener(), Arc::new(TemplateLibrary::builtin()), handle);

        // A black frame: the colon reads 255, unlit below a threshold of 100
        let colon = Region::separator("clock_colon", Rect::new(0, 0, 4, 4));
        let before = fast_config()
            .with_region(colon.clone())
            .with_ticker("First half");
        pipeline.start(before).unwrap();

        wait_for_clock(&mut events, "--.-").await;
        wait_for_ticker(&mut updates, "First half").await;

        let after = fast_config()
            .with_region(colon)
            .with_separator_threshold(300.0)
            .with_ticker("Overtime");
        pipeline.update_config(after).unwrap();

        wait_for_clock(&mut events, "--:--").await;
        wait_for_ticker(&mut updates, "Overtime").await;
        assert_eq!(pipeline.phase(), PipelinePhase::Running);

        pipeline.stop();
    }

    #[tokio::test]
    async fn test_runner_panic_is_reported_without_stop() {
        let (_hub, handle) = BroadcastHub::new(HubConfig::default());
        let opener = FnOpener(
            |_| -> std::result::Result<Box<dyn FrameSource>, FrameSourceError> {
                Ok(Box::new(PanickingSource))
            },
        );

        let (mut pipeline, mut events) =
            Pipeline::new(opener, Arc::new(TemplateLibrary::builtin()), handle);
        pipeline.start(fast_config()).unwrap();

        assert!(matches!(next_event(&mut events).await, PipelineEvent::Started));
        match next_event(&mut events).await {
            PipelineEvent::Failed(reason) => assert!(reason.contains("decoder state corrupted")),
            other => panic!("unexpected event {:?}", other),
        }

        // Visible before anyone joins the thread
        assert_eq!(pipeline.phase(), PipelinePhase::Failed);
        assert!(pipeline
            .last_error()
            .is_some_and(|e| e.contains("panicked")));

        pipeline.stop();
        assert_eq!(pipeline.phase(), PipelinePhase::Failed);

        // Restart from Failed is allowed
        pipeline.start(fast_config()).unwrap();
        assert!(matches!(next_event(&mut events).await, PipelineEvent::Started));
        assert!(matches!(next_event(&mut events).await, PipelineEvent::Failed(_)));
    }
}
