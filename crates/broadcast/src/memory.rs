use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::{BroadcastChannel, PublishError, Result};

/// Default per-subscriber buffer size.
pub const DEFAULT_BUFFER: usize = 64;

/// Default number of publications kept by [`InMemoryBroadcastChannel::published`].
pub const DEFAULT_LOG_CAPACITY: usize = 1024;

/// A message delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Receiving end of a topic subscription.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    receiver: mpsc::Receiver<Message>,
}

impl Subscription {
    /// The topic this subscription listens on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receives the next message, or `None` once the channel is dropped.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Tries to receive a message without waiting.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}

#[derive(Debug, Default)]
struct ChannelState {
    subscribers: HashMap<String, Vec<mpsc::Sender<Message>>>,
    published: VecDeque<Message>,
    fail_on_publish: Option<String>,
}

/// In-process broadcast channel.
///
/// Delivers each publication to every live subscriber of the exact topic
/// and keeps a bounded log of the most recent accepted publications.
/// Failures can be injected with [`set_fail_on_publish`](Self::set_fail_on_publish).
///
/// A publication that finds a subscriber's buffer full fails with
/// [`PublishError::Unavailable`], so critical publishers learn about it.
#[derive(Debug, Clone)]
pub struct InMemoryBroadcastChannel {
    state: Arc<RwLock<ChannelState>>,
    buffer: usize,
    log_capacity: usize,
}

impl Default for InMemoryBroadcastChannel {
    fn default() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }
}

impl InMemoryBroadcastChannel {
    /// Creates a channel with the default subscriber buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a channel whose subscribers buffer up to `buffer` messages.
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            state: Arc::default(),
            buffer: buffer.max(1),
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }

    /// Keeps at most `capacity` publications in the log; `0` disables it.
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Subscribes to an exact topic.
    pub fn subscribe(&self, topic: impl Into<String>) -> Subscription {
        let topic = topic.into();
        let (tx, rx) = mpsc::channel(self.buffer);
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .entry(topic.clone())
            .or_default()
            .push(tx);
        tracing::debug!(%topic, "broadcast subscription added");
        Subscription {
            topic,
            receiver: rx,
        }
    }

    /// Makes every following publish fail with `reason`, or succeed again with `None`.
    pub fn set_fail_on_publish(&self, reason: Option<String>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_publish = reason;
    }

    /// Returns the logged publications, oldest first.
    pub fn published(&self) -> Vec<Message> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .published
            .iter()
            .cloned()
            .collect()
    }

    /// Returns the accepted publications on one topic, oldest first.
    pub fn published_on(&self, topic: &str) -> Vec<Message> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .published
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Returns the number of live subscribers on a topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .get(topic)
            .map_or(0, |subs| subs.iter().filter(|s| !s.is_closed()).count())
    }
}

#[async_trait]
impl BroadcastChannel for InMemoryBroadcastChannel {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(reason) = &state.fail_on_publish {
            metrics::counter!("broadcast_publish_failures_total").increment(1);
            return Err(PublishError::Rejected {
                reason: reason.clone(),
            });
        }

        let message = Message {
            topic: topic.to_string(),
            payload,
        };

        let mut full = 0;
        if let Some(subscribers) = state.subscribers.get_mut(topic) {
            subscribers.retain(|tx| match tx.try_send(message.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    full += 1;
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            });
        }

        if full > 0 {
            metrics::counter!("broadcast_publish_failures_total").increment(1);
            tracing::warn!(%topic, subscribers = full, "subscriber buffer full, message not delivered");
            return Err(PublishError::Unavailable {
                reason: "subscriber buffer full".to_string(),
            });
        }

        if self.log_capacity > 0 {
            while state.published.len() >= self.log_capacity {
                state.published.pop_front();
            }
            state.published.push_back(message);
        }
        metrics::counter!("broadcast_publish_total").increment(1);
        Ok(())
    }
}
