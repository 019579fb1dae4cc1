//! Subscriber set
//!
//! Each connected display page is a subscriber with a bounded outbound queue.
//! Publishing serializes the message once and hands every queue a clone of the
//! same `Bytes`, so the payload is reference-counted rather than copied.
//!
//! A subscriber whose queue is closed or full is dropped on the spot. A slow
//! page cannot hold back the others and reconnects to get the current state.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::message::ScoreboardMessage;

/// Identity of one connected subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId {
    /// Server-assigned session id, unique per process
    pub session_id: u64,
    /// Remote peer
    pub peer_addr: SocketAddr,
}

impl SubscriberId {
    /// Create a subscriber id
    pub fn new(session_id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            session_id,
            peer_addr,
        }
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.session_id, self.peer_addr)
    }
}

/// Result of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers the payload was queued for
    pub delivered: usize,
    /// Subscribers unregistered because their queue was closed or full
    pub dropped: usize,
}

#[derive(Debug)]
struct Subscriber {
    tx: mpsc::Sender<Bytes>,
    registered_at: Instant,
}

/// The registered subscribers and the last published payload
#[derive(Debug, Default)]
pub struct SubscriberSet {
    subscribers: HashMap<SubscriberId, Subscriber>,
    last_payload: Option<Bytes>,
}

impl SubscriberSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber
    ///
    /// Registering an id twice keeps a single entry with the newest queue.
    /// A new subscriber immediately receives the last published payload; one
    /// whose queue is already closed is not added. Returns whether a new
    /// subscriber was added.
    pub fn register(&mut self, id: SubscriberId, tx: mpsc::Sender<Bytes>) -> bool {
        let is_new = !self.subscribers.contains_key(&id);

        if is_new {
            if let Some(payload) = &self.last_payload {
                if tx.try_send(payload.clone()).is_err() {
                    tracing::debug!(subscriber = %id, "Subscriber gone before first update");
                    return false;
                }
            }
        }

        self.subscribers.insert(
            id,
            Subscriber {
                tx,
                registered_at: Instant::now(),
            },
        );

        if is_new {
            tracing::info!(
                subscriber = %id,
                subscribers = self.subscribers.len(),
                "Subscriber registered"
            );
        }

        is_new
    }

    /// Remove a subscriber; returns whether it was registered
    pub fn unregister(&mut self, id: &SubscriberId) -> bool {
        match self.subscribers.remove(id) {
            Some(subscriber) => {
                tracing::info!(
                    subscriber = %id,
                    connected_secs = subscriber.registered_at.elapsed().as_secs(),
                    subscribers = self.subscribers.len(),
                    "Subscriber unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Serialize a message once and queue it for every subscriber
    pub fn publish(
        &mut self,
        message: &ScoreboardMessage,
    ) -> Result<PublishReport, serde_json::Error> {
        let payload = message.to_payload()?;
        Ok(self.publish_payload(payload))
    }

    /// Queue an already serialized payload for every subscriber
    pub fn publish_payload(&mut self, payload: Bytes) -> PublishReport {
        let mut report = PublishReport::default();
        let mut failed = Vec::new();

        for (id, subscriber) in &self.subscribers {
            match subscriber.tx.try_send(payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(subscriber = %id, "Subscriber queue full, dropping");
                    failed.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(subscriber = %id, "Subscriber queue closed");
                    failed.push(*id);
                }
            }
        }

        for id in &failed {
            self.unregister(id);
        }
        report.dropped = failed.len();

        self.last_payload = Some(payload);
        report
    }

    /// Drop subscribers whose connection task has gone away
    pub fn prune_closed(&mut self) -> usize {
        let closed: Vec<SubscriberId> = self
            .subscribers
            .iter()
            .filter(|(_, s)| s.tx.is_closed())
            .map(|(id, _)| *id)
            .collect();

        for id in &closed {
            self.unregister(id);
        }
        closed.len()
    }

    /// Whether a subscriber is registered
    pub fn contains(&self, id: &SubscriberId) -> bool {
        self.subscribers.contains_key(id)
    }

    /// Registered subscriber ids
    pub fn ids(&self) -> impl Iterator<Item = &SubscriberId> {
        self.subscribers.keys()
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether no subscriber is registered
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// The most recently published payload
    pub fn last_payload(&self) -> Option<&Bytes> {
        self.last_payload.as_ref()
    }
}
