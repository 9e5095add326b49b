//! Handler abstraction and its two concrete forms.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use events::DomainEvent;

use crate::error::{HandlerError, RegistryError};

/// What a handler hands back to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The handler completed.
    Ok,
    /// The handler reports a failure.
    Failed(HandlerError),
    /// The handler returned a value the dispatcher cannot interpret.
    Unrecognized(serde_json::Value),
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Reply::Ok
    }
}

impl From<Result<(), HandlerError>> for Reply {
    fn from(result: Result<(), HandlerError>) -> Self {
        match result {
            Ok(()) => Reply::Ok,
            Err(e) => Reply::Failed(e),
        }
    }
}

impl From<HandlerError> for Reply {
    fn from(error: HandlerError) -> Self {
        Reply::Failed(error)
    }
}

/// A reaction to a domain event.
///
/// Handlers run in the task that called [`dispatch`](crate::dispatch),
/// never inside the registry.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str;

    /// Reacts to one event.
    async fn handle(&self, event: &DomainEvent) -> Reply;
}

/// A handler backed by an async closure.
///
/// The closure receives its own copy of the event.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> std::fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut, R> Handler for FnHandler<F>
where
    F: Fn(DomainEvent) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send,
    R: Into<Reply> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &DomainEvent) -> Reply {
        (self.f)(event.clone()).await.into()
    }
}

/// Wraps an async closure as a handler.
pub fn handler_fn<F>(name: impl Into<String>, f: F) -> FnHandler<F> {
    FnHandler::new(name, f)
}

/// Signature of a named handler function.
pub type NamedFn = fn(&DomainEvent) -> Reply;

/// A handler bound from a `module::function` reference.
#[derive(Debug, Clone)]
pub struct NamedHandler {
    name: String,
    f: NamedFn,
}

impl NamedHandler {
    pub fn new(module: &str, function: &str, f: NamedFn) -> Self {
        Self {
            name: format!("{module}::{function}"),
            f,
        }
    }
}

#[async_trait]
impl Handler for NamedHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &DomainEvent) -> Reply {
        (self.f)(event)
    }
}

/// Lookup table resolving `(module, function)` references to handlers.
///
/// Consulted once, when a registry starts; dispatch never looks names up.
#[derive(Debug, Clone, Default)]
pub struct HandlerCatalog {
    functions: HashMap<(String, String), NamedFn>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named function.
    pub fn with(mut self, module: impl Into<String>, function: impl Into<String>, f: NamedFn) -> Self {
        self.functions.insert((module.into(), function.into()), f);
        self
    }

    /// Binds a reference into an invokable handler.
    pub fn resolve(&self, module: &str, function: &str) -> Result<Arc<dyn Handler>, RegistryError> {
        self.functions
            .get(&(module.to_string(), function.to_string()))
            .map(|&f| Arc::new(NamedHandler::new(module, function, f)) as Arc<dyn Handler>)
            .ok_or_else(|| RegistryError::UnresolvedHandler {
                module: module.to_string(),
                function: function.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
