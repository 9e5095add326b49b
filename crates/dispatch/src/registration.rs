//! Handler registration records.

use std::sync::Arc;

use crate::handler::Handler;

/// Priority used when a registration does not set one. Lower runs earlier.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Options supplied with a registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationOptions {
    pub priority: Option<i32>,
}

impl RegistrationOptions {
    /// Options using [`DEFAULT_PRIORITY`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(priority: i32) -> Self {
        Self {
            priority: Some(priority),
        }
    }

    /// The effective priority.
    pub fn priority(&self) -> i32 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }
}

/// One subscription of a handler to an event type.
#[derive(Clone)]
pub struct HandlerRegistration {
    pub event_type: String,
    pub handler: Arc<dyn Handler>,
    pub priority: i32,
    /// Insertion order within the owning registry.
    pub sequence: u64,
}

impl std::fmt::Debug for HandlerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistration")
            .field("event_type", &self.event_type)
            .field("handler", &self.handler.name())
            .field("priority", &self.priority)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// How a start-time handler is supplied.
#[derive(Clone)]
pub enum HandlerRef {
    /// A ready handler value.
    Handler(Arc<dyn Handler>),
    /// A `module::function` reference resolved through a
    /// [`HandlerCatalog`](crate::HandlerCatalog) when the registry starts.
    Named { module: String, function: String },
}

impl std::fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerRef::Handler(h) => f.debug_tuple("Handler").field(&h.name()).finish(),
            HandlerRef::Named { module, function } => f
                .debug_struct("Named")
                .field("module", module)
                .field("function", function)
                .finish(),
        }
    }
}

/// A `(event_type, handler, options)` triple loaded when a registry starts.
#[derive(Debug, Clone)]
pub struct InitialHandler {
    pub event_type: String,
    pub handler: HandlerRef,
    pub options: RegistrationOptions,
}

impl InitialHandler {
    pub fn new(
        event_type: impl Into<String>,
        handler: impl Handler + 'static,
        options: RegistrationOptions,
    ) -> Self {
        Self::shared(event_type, Arc::new(handler), options)
    }

    pub fn shared(
        event_type: impl Into<String>,
        handler: Arc<dyn Handler>,
        options: RegistrationOptions,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            handler: HandlerRef::Handler(handler),
            options,
        }
    }

    pub fn named(
        event_type: impl Into<String>,
        module: impl Into<String>,
        function: impl Into<String>,
        options: RegistrationOptions,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            handler: HandlerRef::Named {
                module: module.into(),
                function: function.into(),
            },
            options,
        }
    }
}
