//! Promotion of domain events into integration events.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use broadcast::{BroadcastChannel, topic};
use common::BoundedContext;
use events::{Criticality, DomainEvent, IntegrationEvent};

use crate::error::{HandlerError, RegistryError};
use crate::handler::{Handler, Reply};
use crate::registration::{InitialHandler, RegistrationOptions};
use crate::registry::HandlerRegistry;

/// How one event type is promoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionRule {
    pub event_type: String,
    pub criticality: Criticality,
    /// Payload fields copied into the integration event.
    pub fields: Vec<String>,
}

impl PromotionRule {
    /// A rule whose publish failures fail the dispatch.
    pub fn critical(event_type: impl Into<String>) -> Self {
        Self::new(event_type, Criticality::Critical)
    }

    /// A rule whose publish failures are logged and swallowed.
    pub fn best_effort(event_type: impl Into<String>) -> Self {
        Self::new(event_type, Criticality::BestEffort)
    }

    pub fn new(event_type: impl Into<String>, criticality: Criticality) -> Self {
        Self {
            event_type: event_type.into(),
            criticality,
            fields: Vec::new(),
        }
    }

    /// Sets the payload fields to expose.
    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }
}

/// Handler publishing integration events for one bounded context.
///
/// Each promoted event type needs a [`PromotionRule`] declaring its
/// criticality. Events go out on `integration:{context}:{event_type}`.
pub struct Promoter {
    name: String,
    context: BoundedContext,
    channel: Arc<dyn BroadcastChannel>,
    rules: HashMap<String, PromotionRule>,
}

impl Promoter {
    pub fn new(context: BoundedContext, channel: Arc<dyn BroadcastChannel>) -> Self {
        Self {
            name: format!("{context}::promoter"),
            context,
            channel,
            rules: HashMap::new(),
        }
    }

    /// Adds a rule, replacing any earlier rule for the same event type.
    pub fn rule(mut self, rule: PromotionRule) -> Self {
        self.rules.insert(rule.event_type.clone(), rule);
        self
    }

    /// The declared criticality for an event type.
    pub fn criticality(&self, event_type: &str) -> Option<Criticality> {
        self.rules.get(event_type).map(|r| r.criticality)
    }

    /// Start-time registrations, one per rule, sharing this promoter.
    pub fn into_initial_handlers(self, options: RegistrationOptions) -> Vec<InitialHandler> {
        let event_types = self.event_types();
        let promoter: Arc<dyn Handler> = Arc::new(self);
        event_types
            .into_iter()
            .map(|event_type| InitialHandler::shared(event_type, Arc::clone(&promoter), options))
            .collect()
    }

    /// Subscribes this promoter to every event type it has a rule for.
    pub async fn subscribe_to(
        self,
        registry: &HandlerRegistry,
        options: RegistrationOptions,
    ) -> Result<(), RegistryError> {
        let event_types = self.event_types();
        let promoter: Arc<dyn Handler> = Arc::new(self);
        for event_type in event_types {
            registry
                .subscribe_shared(event_type, Arc::clone(&promoter), options)
                .await?;
        }
        Ok(())
    }

    fn event_types(&self) -> Vec<String> {
        let mut event_types: Vec<String> = self.rules.keys().cloned().collect();
        event_types.sort();
        event_types
    }
}

#[async_trait]
impl Handler for Promoter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &DomainEvent) -> Reply {
        let Some(rule) = self.rules.get(event.event_type()) else {
            return Reply::Failed(HandlerError::rejected(format!(
                "no promotion rule for '{}'",
                event.event_type()
            )));
        };

        let fields: Vec<&str> = rule.fields.iter().map(String::as_str).collect();
        let integration =
            match IntegrationEvent::promote(&self.context, event, rule.criticality, &fields) {
                Ok(integration) => integration,
                Err(e) => return Reply::Failed(e.into()),
            };
        let payload = match serde_json::to_value(&integration) {
            Ok(payload) => payload,
            Err(e) => return Reply::Failed(HandlerError::Serialization(e.to_string())),
        };

        let topic = topic::integration(&self.context, event.event_type());
        match self.channel.publish(&topic, payload).await {
            Ok(()) => {
                tracing::debug!(%topic, criticality = %rule.criticality, "integration event published");
                Reply::Ok
            }
            Err(source) => match rule.criticality {
                Criticality::Critical => {
                    tracing::error!(%topic, error = %source, "critical integration event not published");
                    Reply::Failed(HandlerError::Publish { topic, source })
                }
                Criticality::BestEffort => {
                    tracing::warn!(%topic, error = %source, "best-effort integration event not published");
                    Reply::Ok
                }
            },
        }
    }
}
