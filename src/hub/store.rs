//! Broadcast hub task
//!
//! The hub task exclusively owns the [`SubscriberSet`]. Everything else talks
//! to it through a cloneable [`HubHandle`] over an unbounded command channel,
//! so `publish` never blocks and is safe to call from the pipeline's blocking
//! thread.

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

use super::config::HubConfig;
use super::error::HubError;
use super::message::ScoreboardMessage;
use super::subscriber::{SubscriberId, SubscriberSet};
use crate::stats::HubStats;

enum Command {
    Register {
        id: SubscriberId,
        tx: mpsc::Sender<Bytes>,
    },
    Unregister(SubscriberId),
    Publish(Box<ScoreboardMessage>),
    Stats(oneshot::Sender<HubStats>),
}

/// Handle to a running hub
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::UnboundedSender<Command>,
    queue_capacity: usize,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Register { id, .. } => write!(f, "Register({})", id),
            Command::Unregister(id) => write!(f, "Unregister({})", id),
            Command::Publish(_) => write!(f, "Publish"),
            Command::Stats(_) => write!(f, "Stats"),
        }
    }
}

impl HubHandle {
    /// Queue a message for every subscriber
    ///
    /// Never blocks. Returns `false` if the hub has stopped.
    pub fn publish(&self, message: ScoreboardMessage) -> bool {
        self.commands
            .send(Command::Publish(Box::new(message)))
            .is_ok()
    }

    /// Register a subscriber with its outbound queue
    pub fn register(&self, id: SubscriberId, tx: mpsc::Sender<Bytes>) -> Result<(), HubError> {
        self.commands
            .send(Command::Register { id, tx })
            .map_err(|_| HubError::Closed)
    }

    /// Create a queue sized by the hub configuration and register it
    pub fn subscribe(&self, id: SubscriberId) -> Result<mpsc::Receiver<Bytes>, HubError> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.register(id, tx)?;
        Ok(rx)
    }

    /// Unregister a subscriber; unknown ids are ignored
    pub fn unregister(&self, id: SubscriberId) {
        let _ = self.commands.send(Command::Unregister(id));
    }

    /// Current hub statistics
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Stats(tx))
            .map_err(|_| HubError::Closed)?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Whether the hub task has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// The hub task state
pub struct BroadcastHub {
    subscribers: SubscriberSet,
    commands: mpsc::UnboundedReceiver<Command>,
    config: HubConfig,
    stats: HubStats,
}

impl BroadcastHub {
    /// Create a hub and its first handle
    pub fn new(config: HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = HubHandle {
            commands: tx,
            queue_capacity: config.queue_capacity.max(1),
        };
        let hub = Self {
            subscribers: SubscriberSet::new(),
            commands: rx,
            config,
            stats: HubStats::new(),
        };
        (hub, handle)
    }

    /// Spawn the hub onto the current runtime
    pub fn spawn(config: HubConfig) -> (HubHandle, tokio::task::JoinHandle<()>) {
        let (hub, handle) = Self::new(config);
        let task = tokio::spawn(hub.run());
        (handle, task)
    }

    /// Process commands until every handle is dropped
    pub async fn run(mut self) {
        let mut housekeeping = tokio::time::interval(self.config.housekeeping_interval);
        housekeeping.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = housekeeping.tick() => self.housekeeping(),
            }
        }

        tracing::debug!(subscribers = self.subscribers.len(), "Broadcast hub stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Register { id, tx } => {
                self.subscribers.register(id, tx);
            }
            Command::Unregister(id) => {
                self.subscribers.unregister(&id);
            }
            Command::Publish(message) => match self.subscribers.publish(&message) {
                Ok(report) => {
                    self.stats.record_publish(&report);
                    tracing::trace!(
                        delivered = report.delivered,
                        dropped = report.dropped,
                        "Published scoreboard update"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize scoreboard update");
                }
            },
            Command::Stats(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn housekeeping(&mut self) {
        let pruned = self.subscribers.prune_closed();
        self.stats.dropped_subscribers += pruned as u64;

        tracing::debug!(
            subscribers = self.subscribers.len(),
            pruned = pruned,
            published = self.stats.messages_published,
            "Hub housekeeping"
        );
    }

    fn snapshot(&self) -> HubStats {
        HubStats {
            subscribers: self.subscribers.len(),
            ..self.stats
        }
    }
}
