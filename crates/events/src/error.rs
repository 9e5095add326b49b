use thiserror::Error;

/// Errors raised while building or translating events.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    /// A required builder field was not set.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field selected for promotion is absent from the domain payload.
    #[error("Payload field '{field}' missing from {event_type}")]
    MissingPayloadField { event_type: String, field: String },

    /// A field selected for promotion is an array or object.
    #[error("Payload field '{field}' of {event_type} is not a primitive value")]
    NonPrimitiveField { event_type: String, field: String },
}

/// Result type for event construction.
pub type Result<T> = std::result::Result<T, EventError>;
