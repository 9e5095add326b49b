//! Per-context handler registry.
//!
//! Each registry is a single task that owns the handler map. Callers hold
//! a cloneable [`HandlerRegistry`] handle and talk to the task over a
//! bounded channel, so every `subscribe` and every read is serialized.

use std::collections::HashMap;
use std::sync::Arc;

use common::BoundedContext;
use tokio::sync::{mpsc, oneshot};

use crate::error::{RegistryError, Result};
use crate::handler::{Handler, HandlerCatalog};
use crate::registration::{HandlerRef, HandlerRegistration, InitialHandler, RegistrationOptions};

/// Default number of queued registry requests.
pub const DEFAULT_MAILBOX: usize = 32;

enum Request {
    Subscribe {
        event_type: String,
        handler: Arc<dyn Handler>,
        options: RegistrationOptions,
        reply: oneshot::Sender<()>,
    },
    Handlers {
        event_type: String,
        reply: oneshot::Sender<Vec<HandlerRegistration>>,
    },
    EventTypes {
        reply: oneshot::Sender<Vec<String>>,
    },
}

struct RegistryTask {
    context: BoundedContext,
    handlers: HashMap<String, Vec<HandlerRegistration>>,
    next_sequence: u64,
}

impl RegistryTask {
    fn append(&mut self, event_type: String, handler: Arc<dyn Handler>, options: RegistrationOptions) {
        let registration = HandlerRegistration {
            event_type: event_type.clone(),
            handler,
            priority: options.priority(),
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        tracing::debug!(
            context = %self.context,
            %event_type,
            handler = registration.handler.name(),
            priority = registration.priority,
            "handler registered"
        );
        self.handlers.entry(event_type).or_default().push(registration);
    }

    async fn run(mut self, mut requests: mpsc::Receiver<Request>) {
        while let Some(request) = requests.recv().await {
            match request {
                Request::Subscribe {
                    event_type,
                    handler,
                    options,
                    reply,
                } => {
                    self.append(event_type, handler, options);
                    // The caller may have given up waiting; the append stands.
                    let _ = reply.send(());
                }
                Request::Handlers { event_type, reply } => {
                    let snapshot = self.handlers.get(&event_type).cloned().unwrap_or_default();
                    let _ = reply.send(snapshot);
                }
                Request::EventTypes { reply } => {
                    let mut types: Vec<String> = self.handlers.keys().cloned().collect();
                    types.sort();
                    let _ = reply.send(types);
                }
            }
        }
        tracing::debug!(context = %self.context, "handler registry stopped");
    }
}

/// Handle to the handler registry of one bounded context.
///
/// Cloning the handle shares the same registry. The registry task stops
/// when the last handle is dropped, and its dynamic subscriptions go with it.
#[derive(Clone)]
pub struct HandlerRegistry {
    context: BoundedContext,
    requests: mpsc::Sender<Request>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl HandlerRegistry {
    /// Starts a registry pre-loaded with `initial` handlers.
    ///
    /// # Errors
    ///
    /// Fails with [`RegistryError::UnresolvedHandler`] if an initial handler
    /// is a named reference; use [`builder`](Self::builder) with a
    /// [`HandlerCatalog`] to resolve those.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(
        context: BoundedContext,
        initial: impl IntoIterator<Item = InitialHandler>,
    ) -> Result<Self> {
        Self::builder(context).handlers(initial).start()
    }

    /// Creates a builder for a registry with a catalog or custom mailbox.
    pub fn builder(context: BoundedContext) -> RegistryBuilder {
        RegistryBuilder {
            context,
            initial: Vec::new(),
            catalog: HandlerCatalog::default(),
            mailbox: DEFAULT_MAILBOX,
        }
    }

    /// The bounded context owning this registry.
    pub fn context(&self) -> &BoundedContext {
        &self.context
    }

    /// Appends a handler for `event_type`.
    ///
    /// Returns once the registration is visible to every later
    /// [`handlers`](Self::handlers) call.
    pub async fn subscribe(
        &self,
        event_type: impl Into<String>,
        handler: impl Handler + 'static,
        options: RegistrationOptions,
    ) -> Result<()> {
        self.subscribe_shared(event_type, Arc::new(handler), options)
            .await
    }

    /// Like [`subscribe`](Self::subscribe), for a handler shared between registrations.
    pub async fn subscribe_shared(
        &self,
        event_type: impl Into<String>,
        handler: Arc<dyn Handler>,
        options: RegistrationOptions,
    ) -> Result<()> {
        let (reply, ack) = oneshot::channel();
        self.send(Request::Subscribe {
            event_type: event_type.into(),
            handler,
            options,
            reply,
        })
        .await?;
        ack.await.map_err(|_| self.closed())
    }

    /// Returns the registrations for `event_type` in registration order.
    ///
    /// The list is a snapshot; an empty list means nothing is subscribed.
    pub async fn handlers(&self, event_type: &str) -> Result<Vec<HandlerRegistration>> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Handlers {
            event_type: event_type.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.closed())
    }

    /// Returns the event types with at least one handler, sorted.
    pub async fn event_types(&self) -> Result<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::EventTypes { reply }).await?;
        rx.await.map_err(|_| self.closed())
    }

    async fn send(&self, request: Request) -> Result<()> {
        self.requests.send(request).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> RegistryError {
        RegistryError::Closed(self.context.clone())
    }
}

/// Builder for a [`HandlerRegistry`].
pub struct RegistryBuilder {
    context: BoundedContext,
    initial: Vec<InitialHandler>,
    catalog: HandlerCatalog,
    mailbox: usize,
}

impl RegistryBuilder {
    /// Adds one start-time handler.
    pub fn handler(mut self, initial: InitialHandler) -> Self {
        self.initial.push(initial);
        self
    }

    /// Adds start-time handlers, keeping their order.
    pub fn handlers(mut self, initial: impl IntoIterator<Item = InitialHandler>) -> Self {
        self.initial.extend(initial);
        self
    }

    /// Sets the catalog used to resolve named handler references.
    pub fn catalog(mut self, catalog: HandlerCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets how many requests may queue before callers wait.
    pub fn mailbox(mut self, mailbox: usize) -> Self {
        self.mailbox = mailbox.max(1);
        self
    }

    /// Resolves the start-time handlers and spawns the registry task.
    ///
    /// Start-time handlers are loaded before the task accepts any request,
    /// so they always precede dynamic subscriptions in registration order.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnresolvedHandler`] if a named reference is not in the catalog.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(self) -> Result<HandlerRegistry> {
        let mut task = RegistryTask {
            context: self.context.clone(),
            handlers: HashMap::new(),
            next_sequence: 0,
        };

        for initial in self.initial {
            let handler = match initial.handler {
                HandlerRef::Handler(handler) => handler,
                HandlerRef::Named { module, function } => {
                    self.catalog.resolve(&module, &function)?
                }
            };
            task.append(initial.event_type, handler, initial.options);
        }

        tracing::info!(
            context = %self.context,
            handlers = task.next_sequence,
            "handler registry started"
        );

        let (tx, rx) = mpsc::channel(self.mailbox);
        tokio::spawn(task.run(rx));

        Ok(HandlerRegistry {
            context: self.context,
            requests: tx,
        })
    }
}
