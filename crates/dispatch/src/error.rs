//! Dispatch error types.

use broadcast::PublishError;
use common::BoundedContext;
use events::EventError;
use thiserror::Error;

/// Failure reported by a handler itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    /// A business-level failure, carried verbatim.
    #[error("{0}")]
    Rejected(String),

    /// Publishing to the broadcast channel failed.
    #[error("Publish to '{topic}' failed: {source}")]
    Publish { topic: String, source: PublishError },

    /// A domain event could not be translated into an integration event.
    #[error("Translation error: {0}")]
    Translation(#[from] EventError),

    /// An event could not be serialized for publishing.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl HandlerError {
    /// Shorthand for a business-level failure.
    pub fn rejected(reason: impl Into<String>) -> Self {
        HandlerError::Rejected(reason.into())
    }
}

/// One failed handler invocation, as captured by the dispatcher.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerFailure {
    /// The handler returned an explicit failure.
    #[error("Handler '{handler}' failed: {error}")]
    Failed { handler: String, error: HandlerError },

    /// The handler returned something that is neither success nor failure.
    #[error("Handler '{handler}' returned an unexpected value: {value}")]
    UnexpectedReturn {
        handler: String,
        value: serde_json::Value,
    },

    /// The handler panicked.
    #[error("Handler '{handler}' crashed: {message}")]
    Crashed { handler: String, message: String },
}

impl HandlerFailure {
    /// Name of the handler that failed.
    pub fn handler(&self) -> &str {
        match self {
            HandlerFailure::Failed { handler, .. }
            | HandlerFailure::UnexpectedReturn { handler, .. }
            | HandlerFailure::Crashed { handler, .. } => handler,
        }
    }

    /// The explicit handler error, if this is a [`HandlerFailure::Failed`].
    pub fn error(&self) -> Option<&HandlerError> {
        match self {
            HandlerFailure::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Errors from the handler registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// The registry task has stopped.
    #[error("Handler registry for '{0}' is closed")]
    Closed(BoundedContext),

    /// No registry is known for the context.
    #[error("Unknown bounded context: {0}")]
    UnknownContext(BoundedContext),

    /// A registry for the context already exists.
    #[error("Bounded context already registered: {0}")]
    DuplicateContext(BoundedContext),

    /// A start-time handler reference names no known function.
    #[error("No handler named {module}::{function}")]
    UnresolvedHandler { module: String, function: String },
}

/// Errors returned by [`dispatch`](crate::dispatch).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// One or more handlers failed. Failures are in execution order.
    #[error("{} handler(s) failed for '{event_type}'", .failures.len())]
    HandlersFailed {
        event_type: String,
        failures: Vec<HandlerFailure>,
    },

    /// The handler list could not be read.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl DispatchError {
    /// The captured handler failures; empty for registry errors.
    pub fn failures(&self) -> &[HandlerFailure] {
        match self {
            DispatchError::HandlersFailed { failures, .. } => failures,
            DispatchError::Registry(_) => &[],
        }
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
