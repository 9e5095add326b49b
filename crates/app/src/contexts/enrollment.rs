//! Enrollment bounded context.
//!
//! Keeps program enrollments per user and reacts to accounts'
//! `user_deleted` integration event by withdrawing that user everywhere.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use broadcast::{BroadcastChannel, Subscription};
use common::{AggregateId, BoundedContext};
use dispatch::{HandlerRegistry, InitialHandler, RegistrationOptions, UiNotifier, dispatch};
use events::{DomainEvent, EventError, IntegrationEvent};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::error::AppError;

pub const CONTEXT: &str = "enrollment";
pub const AGGREGATE_TYPE: &str = "enrollment";
pub const ENROLLMENT_SUBMITTED: &str = "enrollment_submitted";
pub const ENROLLMENT_WITHDRAWN: &str = "enrollment_withdrawn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub id: AggregateId,
    pub user_id: AggregateId,
    pub program: String,
}

pub struct EnrollmentContext {
    registry: HandlerRegistry,
    enrollments: RwLock<HashMap<AggregateId, Enrollment>>,
}

impl EnrollmentContext {
    pub fn start(channel: Arc<dyn BroadcastChannel>, mailbox: usize) -> Result<Self, AppError> {
        let context = BoundedContext::new(CONTEXT)?;
        let registry = HandlerRegistry::builder(context)
            .handlers(Self::reactions(channel))
            .mailbox(mailbox)
            .start()?;
        Ok(Self {
            registry,
            enrollments: RwLock::default(),
        })
    }

    /// Both enrollment events refresh UIs through one shared notifier.
    pub fn reactions(channel: Arc<dyn BroadcastChannel>) -> Vec<InitialHandler> {
        let notifier: Arc<dyn dispatch::Handler> =
            Arc::new(UiNotifier::named("enrollment::ui", channel));
        [ENROLLMENT_SUBMITTED, ENROLLMENT_WITHDRAWN]
            .into_iter()
            .map(|event_type| {
                InitialHandler::shared(event_type, Arc::clone(&notifier), RegistrationOptions::new())
            })
            .collect()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Enrollments held by `user_id`, in no particular order.
    pub async fn enrollments_of(&self, user_id: AggregateId) -> Vec<Enrollment> {
        self.enrollments
            .read()
            .await
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Waits until `user_id` holds no enrollments; `false` if `timeout` elapses first.
    pub async fn wait_until_withdrawn(&self, user_id: AggregateId, timeout: Duration) -> bool {
        let poll = async {
            while !self.enrollments_of(user_id).await.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }

    #[tracing::instrument(skip(self))]
    pub async fn submit_enrollment(
        &self,
        user_id: AggregateId,
        program: &str,
    ) -> Result<AggregateId, EventError> {
        let enrollment = Enrollment {
            id: AggregateId::new(),
            user_id,
            program: program.to_string(),
        };
        self.enrollments
            .write()
            .await
            .insert(enrollment.id, enrollment.clone());

        self.emit(ENROLLMENT_SUBMITTED, &enrollment).await?;
        Ok(enrollment.id)
    }

    /// Withdraws every enrollment of `user_id`; returns how many were removed.
    #[tracing::instrument(skip(self))]
    pub async fn withdraw_user(&self, user_id: AggregateId) -> Result<usize, EventError> {
        let withdrawn: Vec<Enrollment> = {
            let mut enrollments = self.enrollments.write().await;
            let ids: Vec<AggregateId> = enrollments
                .values()
                .filter(|e| e.user_id == user_id)
                .map(|e| e.id)
                .collect();
            ids.iter().filter_map(|id| enrollments.remove(id)).collect()
        };

        for enrollment in &withdrawn {
            self.emit(ENROLLMENT_WITHDRAWN, enrollment).await?;
        }
        Ok(withdrawn.len())
    }

    /// Dispatches an enrollment event. Reaction failures are logged only.
    async fn emit(&self, event_type: &str, enrollment: &Enrollment) -> Result<(), EventError> {
        let event = DomainEvent::builder()
            .event_type(event_type)
            .aggregate_id(enrollment.id)
            .aggregate_type(AGGREGATE_TYPE)
            .field("user_id", enrollment.user_id.to_string())
            .field("program", enrollment.program.as_str())
            .build()?;

        if let Err(e) = dispatch(&self.registry, &event).await {
            tracing::warn!(enrollment_id = %enrollment.id, error = %e, "enrollment reactions failed");
        }
        Ok(())
    }
}

/// Consumes `user_deleted` integration events and withdraws the user.
///
/// Runs until the subscription closes. Undecodable messages are skipped.
pub fn spawn_user_deleted_listener(
    enrollment: Arc<EnrollmentContext>,
    mut subscription: Subscription,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = subscription.recv().await {
            let event: IntegrationEvent = match serde_json::from_value(message.payload) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(topic = %message.topic, error = %e, "integration event not decoded");
                    continue;
                }
            };

            match enrollment.withdraw_user(event.entity_id()).await {
                Ok(count) => tracing::info!(
                    user_id = %event.entity_id(),
                    source = %event.source_context(),
                    withdrawn = count,
                    "user withdrawn after deletion"
                ),
                Err(e) => tracing::error!(user_id = %event.entity_id(), error = %e, "withdrawal failed"),
            }
        }
        tracing::debug!(topic = subscription.topic(), "integration listener stopped");
    })
}
