//! Topic naming conventions other contexts and UIs subscribe to.

use common::BoundedContext;

/// Topic for an integration event: `integration:{context}:{event_type}`.
pub fn integration(source_context: &BoundedContext, event_type: &str) -> String {
    format!("integration:{source_context}:{event_type}")
}

/// Topic for a UI refresh: `{aggregate_type}:{event_type}`.
pub fn ui(aggregate_type: &str, event_type: &str) -> String {
    format!("{aggregate_type}:{event_type}")
}
