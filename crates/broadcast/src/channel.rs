//! Broadcast channel trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;

/// A topic-addressed publish/subscribe primitive.
///
/// Implementations must be thread-safe; handlers in different tasks
/// publish through the same channel.
#[async_trait]
pub trait BroadcastChannel: Send + Sync {
    /// Publishes `payload` to every subscriber of `topic`.
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()>;
}

#[async_trait]
impl<T: BroadcastChannel + ?Sized> BroadcastChannel for Arc<T> {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        (**self).publish(topic, payload).await
    }
}
