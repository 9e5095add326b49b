//! Accounts bounded context.
//!
//! Owns users. Registration is promoted best-effort and refreshes UIs;
//! deletion is promoted as a critical integration event so a failed
//! publication halts the cascade that depends on it.

use std::collections::HashMap;
use std::sync::Arc;

use broadcast::BroadcastChannel;
use common::{AggregateId, BoundedContext};
use dispatch::{
    DispatchError, HandlerRegistry, InitialHandler, Promoter, PromotionRule, RegistrationOptions,
    UiNotifier, dispatch,
};
use events::{DomainEvent, EventError};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::error::AppError;

pub const CONTEXT: &str = "accounts";
pub const AGGREGATE_TYPE: &str = "user";
pub const USER_REGISTERED: &str = "user_registered";
pub const USER_DELETED: &str = "user_deleted";

/// Errors from accounts operations.
#[derive(Debug, Error)]
pub enum AccountsError {
    #[error("User not found: {0}")]
    UserNotFound(AggregateId),

    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// The user is deleted, but a critical reaction did not complete.
    #[error("User {user_id} deleted but dependent contexts were not notified: {source}")]
    CascadeHalted {
        user_id: AggregateId,
        source: DispatchError,
    },

    #[error("Event error: {0}")]
    Event(#[from] EventError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: AggregateId,
    pub email: String,
    pub name: String,
}

/// The accounts context and its in-memory user store.
pub struct AccountsContext {
    registry: HandlerRegistry,
    users: RwLock<HashMap<AggregateId, User>>,
}

impl AccountsContext {
    /// Starts the context with its standard reactions.
    pub fn start(channel: Arc<dyn BroadcastChannel>, mailbox: usize) -> Result<Self, AppError> {
        let context = BoundedContext::new(CONTEXT)?;
        let registry = HandlerRegistry::builder(context.clone())
            .handlers(Self::reactions(context, channel))
            .mailbox(mailbox)
            .start()?;
        Ok(Self {
            registry,
            users: RwLock::default(),
        })
    }

    /// Start-time handlers: promotion first, then UI refresh.
    pub fn reactions(
        context: BoundedContext,
        channel: Arc<dyn BroadcastChannel>,
    ) -> Vec<InitialHandler> {
        let mut handlers = Promoter::new(context, Arc::clone(&channel))
            .rule(PromotionRule::best_effort(USER_REGISTERED).with_fields(&["email", "name"]))
            .rule(PromotionRule::critical(USER_DELETED))
            .into_initial_handlers(RegistrationOptions::with_priority(10));
        handlers.push(InitialHandler::new(
            USER_REGISTERED,
            UiNotifier::named("accounts::ui", channel),
            RegistrationOptions::new(),
        ));
        handlers
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub async fn user(&self, id: AggregateId) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    /// Registers a user, then dispatches `user_registered`.
    ///
    /// Reaction failures are logged; the registration stands.
    #[tracing::instrument(skip(self))]
    pub async fn register_user(&self, email: &str, name: &str) -> Result<AggregateId, AccountsError> {
        let user = {
            let mut users = self.users.write().await;
            if users.values().any(|u| u.email == email) {
                return Err(AccountsError::EmailTaken(email.to_string()));
            }
            let user = User {
                id: AggregateId::new(),
                email: email.to_string(),
                name: name.to_string(),
            };
            users.insert(user.id, user.clone());
            user
        };

        let event = DomainEvent::builder()
            .event_type(USER_REGISTERED)
            .aggregate_id(user.id)
            .aggregate_type(AGGREGATE_TYPE)
            .field("email", user.email.as_str())
            .field("name", user.name.as_str())
            .build()?;

        if let Err(e) = dispatch(&self.registry, &event).await {
            tracing::warn!(user_id = %user.id, error = %e, "user registered with failed reactions");
        }
        Ok(user.id)
    }

    /// Deletes a user, then dispatches `user_deleted`.
    ///
    /// Any dispatch failure is returned as [`AccountsError::CascadeHalted`];
    /// the deletion itself is already committed.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, id: AggregateId) -> Result<(), AccountsError> {
        let user = self
            .users
            .write()
            .await
            .remove(&id)
            .ok_or(AccountsError::UserNotFound(id))?;

        let event = DomainEvent::builder()
            .event_type(USER_DELETED)
            .aggregate_id(user.id)
            .aggregate_type(AGGREGATE_TYPE)
            .build()?;

        dispatch(&self.registry, &event).await.map_err(|source| {
            metrics::counter!("accounts_cascade_halted_total").increment(1);
            AccountsError::CascadeHalted {
                user_id: user.id,
                source,
            }
        })
    }
}
