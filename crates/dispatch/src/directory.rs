//! Registries addressed by bounded context.

use std::collections::HashMap;

use common::BoundedContext;
use events::DomainEvent;

use crate::dispatcher;
use crate::error::{DispatchError, RegistryError, Result};
use crate::handler::Handler;
use crate::registration::{HandlerRegistration, RegistrationOptions};
use crate::registry::HandlerRegistry;

/// One registry per bounded context, built explicitly and passed to the
/// code that needs it.
#[derive(Debug, Clone, Default)]
pub struct ContextDirectory {
    registries: HashMap<BoundedContext, HandlerRegistry>,
}

impl ContextDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the registry for its context.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateContext`] if the context already has one.
    pub fn register(&mut self, registry: HandlerRegistry) -> Result<()> {
        let context = registry.context().clone();
        if self.registries.contains_key(&context) {
            return Err(RegistryError::DuplicateContext(context));
        }
        self.registries.insert(context, registry);
        Ok(())
    }

    /// Returns the registry owned by `context`.
    pub fn registry(&self, context: &BoundedContext) -> Result<&HandlerRegistry> {
        self.registries
            .get(context)
            .ok_or_else(|| RegistryError::UnknownContext(context.clone()))
    }

    /// Registered contexts, sorted by name.
    pub fn contexts(&self) -> Vec<&BoundedContext> {
        let mut contexts: Vec<_> = self.registries.keys().collect();
        contexts.sort();
        contexts
    }

    pub async fn subscribe(
        &self,
        context: &BoundedContext,
        event_type: impl Into<String>,
        handler: impl Handler + 'static,
        options: RegistrationOptions,
    ) -> Result<()> {
        self.registry(context)?
            .subscribe(event_type, handler, options)
            .await
    }

    pub async fn handlers(
        &self,
        context: &BoundedContext,
        event_type: &str,
    ) -> Result<Vec<HandlerRegistration>> {
        self.registry(context)?.handlers(event_type).await
    }

    /// Dispatches `event` through the registry of `context`.
    pub async fn dispatch(
        &self,
        context: &BoundedContext,
        event: &DomainEvent,
    ) -> std::result::Result<(), DispatchError> {
        dispatcher::dispatch(self.registry(context)?, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use events::AggregateId;

    use crate::handler::{Reply, handler_fn};

    fn context(name: &str) -> BoundedContext {
        BoundedContext::new(name).unwrap()
    }

    fn event() -> DomainEvent {
        DomainEvent::builder()
            .event_type("program_created")
            .aggregate_id(AggregateId::new())
            .aggregate_type("program")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_registries_are_isolated_per_context() {
        let mut directory = ContextDirectory::new();
        directory
            .register(HandlerRegistry::start(context("catalog"), Vec::new()).unwrap())
            .unwrap();
        directory
            .register(HandlerRegistry::start(context("messaging"), Vec::new()).unwrap())
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        directory
            .subscribe(
                &context("catalog"),
                "program_created",
                handler_fn("count", move |_event: DomainEvent| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Reply::Ok }
                }),
                RegistrationOptions::new(),
            )
            .await
            .unwrap();

        directory.dispatch(&context("messaging"), &event()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        directory.dispatch(&context("catalog"), &event()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(
            directory.contexts(),
            vec![&context("catalog"), &context("messaging")]
        );
    }

    #[tokio::test]
    async fn test_unknown_context() {
        let directory = ContextDirectory::new();
        let err = directory
            .dispatch(&context("billing"), &event())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::Registry(RegistryError::UnknownContext(context("billing")))
        );
    }

    #[tokio::test]
    async fn test_duplicate_context_rejected() {
        let mut directory = ContextDirectory::new();
        directory
            .register(HandlerRegistry::start(context("catalog"), Vec::new()).unwrap())
            .unwrap();

        let err = directory
            .register(HandlerRegistry::start(context("catalog"), Vec::new()).unwrap())
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateContext(context("catalog")));
    }
}
