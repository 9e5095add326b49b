use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AggregateId, EventError, EventId, Result};

/// Open key/value payload carried by a domain event.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Something that happened inside one bounded context.
///
/// Fields are only reachable through accessors, so once built an event
/// cannot be changed by the handlers it is dispatched to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    event_id: EventId,
    event_type: String,
    aggregate_id: AggregateId,
    aggregate_type: String,
    payload: Payload,
    occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    /// Creates a new domain event builder.
    pub fn builder() -> DomainEventBuilder {
        DomainEventBuilder::default()
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// The type of the event (e.g. `user_registered`), used to select handlers.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    /// Coarse category of the entity (e.g. `user`, `enrollment`).
    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns a single payload value by key.
    pub fn payload_field(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Builder for constructing domain events.
#[derive(Debug, Default)]
pub struct DomainEventBuilder {
    event_id: Option<EventId>,
    event_type: Option<String>,
    aggregate_id: Option<AggregateId>,
    aggregate_type: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
    payload: Payload,
}

impl DomainEventBuilder {
    /// Sets the event ID. If not set, a new ID will be generated.
    pub fn event_id(mut self, id: EventId) -> Self {
        self.event_id = Some(id);
        self
    }

    /// Sets the event type.
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the aggregate ID.
    pub fn aggregate_id(mut self, id: AggregateId) -> Self {
        self.aggregate_id = Some(id);
        self
    }

    /// Sets the aggregate type.
    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    /// Sets the occurrence time. If not set, the current time will be used.
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    /// Adds one payload entry.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Replaces the whole payload.
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Builds the domain event.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::MissingField`] if `event_type`, `aggregate_id`
    /// or `aggregate_type` was not set.
    pub fn build(self) -> Result<DomainEvent> {
        Ok(DomainEvent {
            event_id: self.event_id.unwrap_or_default(),
            event_type: self
                .event_type
                .ok_or(EventError::MissingField("event_type"))?,
            aggregate_id: self
                .aggregate_id
                .ok_or(EventError::MissingField("aggregate_id"))?,
            aggregate_type: self
                .aggregate_type
                .ok_or(EventError::MissingField("aggregate_type"))?,
            payload: self.payload,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_all_fields() {
        let aggregate_id = AggregateId::new();

        let event = DomainEvent::builder()
            .event_type("user_registered")
            .aggregate_id(aggregate_id)
            .aggregate_type("user")
            .field("email", "ada@example.com")
            .field("age", 36)
            .build()
            .unwrap();

        assert_eq!(event.event_type(), "user_registered");
        assert_eq!(event.aggregate_id(), aggregate_id);
        assert_eq!(event.aggregate_type(), "user");
        assert_eq!(
            event.payload_field("email"),
            Some(&serde_json::json!("ada@example.com"))
        );
        assert_eq!(event.payload().len(), 2);
    }

    #[test]
    fn builder_reports_first_missing_field() {
        let err = DomainEvent::builder().build().unwrap_err();
        assert_eq!(err, EventError::MissingField("event_type"));

        let err = DomainEvent::builder()
            .event_type("x")
            .aggregate_id(AggregateId::new())
            .build()
            .unwrap_err();
        assert_eq!(err, EventError::MissingField("aggregate_type"));
    }

    #[test]
    fn occurred_at_defaults_to_now() {
        let before = Utc::now();
        let event = DomainEvent::builder()
            .event_type("x")
            .aggregate_id(AggregateId::new())
            .aggregate_type("thing")
            .build()
            .unwrap();
        assert!(event.occurred_at() >= before);
    }

    #[test]
    fn serializes_with_public_field_names() {
        let event = DomainEvent::builder()
            .event_type("program_created")
            .aggregate_id(AggregateId::new())
            .aggregate_type("program")
            .field("title", "Chess Club")
            .build()
            .unwrap();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "program_created");
        assert_eq!(json["aggregate_type"], "program");
        assert_eq!(json["payload"]["title"], "Chess Club");
    }
}
