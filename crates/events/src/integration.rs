use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AggregateId, BoundedContext, DomainEvent, EventError, EventId, Payload, Result};

/// Whether a failed publication of an integration event must propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    /// Publish failures surface as a dispatch failure.
    Critical,
    /// Publish failures are logged and swallowed.
    BestEffort,
}

impl std::fmt::Display for Criticality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Criticality::Critical => f.write_str("critical"),
            Criticality::BestEffort => f.write_str("best_effort"),
        }
    }
}

/// A fact safe to expose to other bounded contexts.
///
/// Only built through [`IntegrationEvent::promote`], which copies public
/// fields off a [`DomainEvent`] and never keeps a reference to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationEvent {
    event_id: EventId,
    event_type: String,
    source_context: BoundedContext,
    entity_type: String,
    entity_id: AggregateId,
    criticality: Criticality,
    payload: Payload,
    occurred_at: DateTime<Utc>,
}

impl IntegrationEvent {
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The bounded context that published the event.
    pub fn source_context(&self) -> &BoundedContext {
        &self.source_context
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_id(&self) -> AggregateId {
        self.entity_id
    }

    pub fn criticality(&self) -> Criticality {
        self.criticality
    }

    /// Exposed fields; primitive-typed values only.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Translates a domain event into an integration event.
    ///
    /// Only the payload entries named in `fields` are carried over.
    ///
    /// # Errors
    ///
    /// - [`EventError::MissingPayloadField`] if a named field is absent
    /// - [`EventError::NonPrimitiveField`] if a named field holds an array or object
    pub fn promote(
        source_context: &BoundedContext,
        event: &DomainEvent,
        criticality: Criticality,
        fields: &[&str],
    ) -> Result<Self> {
        let mut payload = Payload::new();
        for &field in fields {
            let value = event
                .payload_field(field)
                .ok_or_else(|| EventError::MissingPayloadField {
                    event_type: event.event_type().to_string(),
                    field: field.to_string(),
                })?;
            if value.is_array() || value.is_object() {
                return Err(EventError::NonPrimitiveField {
                    event_type: event.event_type().to_string(),
                    field: field.to_string(),
                });
            }
            payload.insert(field.to_string(), value.clone());
        }

        Ok(Self {
            event_id: EventId::new(),
            event_type: event.event_type().to_string(),
            source_context: source_context.clone(),
            entity_type: event.aggregate_type().to_string(),
            entity_id: event.aggregate_id(),
            criticality,
            payload,
            occurred_at: event.occurred_at(),
        })
    }
}
