//! Event dispatch for bounded contexts.
//!
//! This crate provides:
//! - [`Handler`] trait with closure ([`FnHandler`]) and named-function ([`NamedHandler`]) forms
//! - [`HandlerRegistry`], one single-writer registry task per bounded context
//! - [`dispatch`], which runs every handler for an event in the caller's task,
//!   in priority order, and aggregates failures
//! - [`ContextDirectory`] for addressing registries by context
//! - Two standard reactions: [`Promoter`] (integration events) and [`UiNotifier`] (UI refresh)

pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod notifier;
pub mod promoter;
pub mod registration;
pub mod registry;

pub use directory::ContextDirectory;
pub use dispatcher::dispatch;
pub use error::{DispatchError, HandlerError, HandlerFailure, RegistryError, Result};
pub use handler::{FnHandler, Handler, HandlerCatalog, NamedFn, NamedHandler, Reply, handler_fn};
pub use notifier::UiNotifier;
pub use promoter::{PromotionRule, Promoter};
pub use registration::{
    DEFAULT_PRIORITY, HandlerRef, HandlerRegistration, InitialHandler, RegistrationOptions,
};
pub use registry::{HandlerRegistry, RegistryBuilder};
