//! Event model shared by every bounded context.
//!
//! - [`DomainEvent`]: a fact local to one context, built with [`DomainEventBuilder`]
//! - [`IntegrationEvent`]: the translated, cross-context-safe form of a domain event
//! - [`Criticality`]: whether a failed publication of an integration event must surface

pub mod domain;
pub mod error;
pub mod integration;

pub use common::{AggregateId, BoundedContext, EventId};
pub use domain::{DomainEvent, DomainEventBuilder, Payload};
pub use error::{EventError, Result};
pub use integration::{Criticality, IntegrationEvent};
