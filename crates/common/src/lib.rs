//! Shared identity types used across bounded contexts.

mod types;

pub use types::{AggregateId, BoundedContext, EventId, InvalidContextName};
