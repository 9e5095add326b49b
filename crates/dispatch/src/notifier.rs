//! UI refresh notifications.

use std::sync::Arc;

use async_trait::async_trait;
use broadcast::{BroadcastChannel, topic};
use events::DomainEvent;

use crate::handler::{Handler, Reply};

/// Handler broadcasting domain events for live UI refresh.
///
/// Publishes the raw event on `{aggregate_type}:{event_type}`. A failed
/// publish is logged and never fails the dispatch.
pub struct UiNotifier {
    name: String,
    channel: Arc<dyn BroadcastChannel>,
}

impl UiNotifier {
    pub fn new(channel: Arc<dyn BroadcastChannel>) -> Self {
        Self::named("ui_notifier", channel)
    }

    /// Creates a notifier reporting under a custom handler name.
    pub fn named(name: impl Into<String>, channel: Arc<dyn BroadcastChannel>) -> Self {
        Self {
            name: name.into(),
            channel,
        }
    }
}

#[async_trait]
impl Handler for UiNotifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &DomainEvent) -> Reply {
        let topic = topic::ui(event.aggregate_type(), event.event_type());

        let payload = match serde_json::to_value(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(%topic, error = %e, "ui notification not serialized");
                return Reply::Ok;
            }
        };

        if let Err(e) = self.channel.publish(&topic, payload).await {
            tracing::warn!(%topic, error = %e, "ui notification not published");
        }
        Reply::Ok
    }
}
