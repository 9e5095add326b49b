//! Priority-ordered, failure-isolating dispatch.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use events::DomainEvent;
use futures_util::FutureExt;

use crate::error::{DispatchError, HandlerFailure};
use crate::handler::Reply;
use crate::registration::HandlerRegistration;
use crate::registry::HandlerRegistry;

/// Runs every handler registered for the event's type.
///
/// Handlers run one after another in the calling task, ordered by
/// ascending priority and then by registration order. A failing or
/// panicking handler never stops the ones after it. With no handlers
/// registered the call succeeds.
///
/// Returns [`DispatchError::HandlersFailed`] with one entry per failed
/// handler, in execution order. A failure means a reaction did not
/// complete; it says nothing about the operation that produced the event.
#[tracing::instrument(
    skip(registry, event),
    fields(
        context = %registry.context(),
        event_type = %event.event_type(),
        event_id = %event.event_id(),
    )
)]
pub async fn dispatch(registry: &HandlerRegistry, event: &DomainEvent) -> Result<(), DispatchError> {
    metrics::counter!("dispatch_total").increment(1);

    let mut handlers = registry.handlers(event.event_type()).await?;
    if handlers.is_empty() {
        tracing::debug!("no handlers registered");
        return Ok(());
    }

    handlers.sort_by_key(|r| (r.priority, r.sequence));

    let started = Instant::now();
    let mut failures = Vec::new();
    for registration in &handlers {
        if let Some(failure) = invoke(registration, event).await {
            failures.push(failure);
        }
    }
    metrics::histogram!("dispatch_duration_seconds").record(started.elapsed().as_secs_f64());

    if failures.is_empty() {
        tracing::debug!(handlers = handlers.len(), "dispatch complete");
        return Ok(());
    }

    metrics::counter!("dispatch_failures_total").increment(1);
    tracing::warn!(
        handlers = handlers.len(),
        failed = failures.len(),
        "dispatch completed with failures"
    );
    Err(DispatchError::HandlersFailed {
        event_type: event.event_type().to_string(),
        failures,
    })
}

/// Invokes one handler and captures its outcome.
async fn invoke(registration: &HandlerRegistration, event: &DomainEvent) -> Option<HandlerFailure> {
    let handler = registration.handler.as_ref();

    // The call happens inside the wrapped future so a panic while building
    // the handler's future is caught too.
    let outcome = AssertUnwindSafe(async { handler.handle(event).await })
        .catch_unwind()
        .await;

    let failure = match outcome {
        Ok(Reply::Ok) => return None,
        Ok(Reply::Failed(error)) => HandlerFailure::Failed {
            handler: handler.name().to_string(),
            error,
        },
        Ok(Reply::Unrecognized(value)) => HandlerFailure::UnexpectedReturn {
            handler: handler.name().to_string(),
            value,
        },
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(handler = handler.name(), %message, "handler crashed");
            HandlerFailure::Crashed {
                handler: handler.name().to_string(),
                message,
            }
        }
    };

    metrics::counter!("handler_failures_total").increment(1);
    tracing::warn!(handler = handler.name(), error = %failure, "handler failed");
    Some(failure)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use common::BoundedContext;
    use events::AggregateId;

    use crate::error::HandlerError;
    use crate::handler::{Handler, handler_fn};
    use crate::registration::{InitialHandler, RegistrationOptions};

    fn registry() -> HandlerRegistry {
        HandlerRegistry::start(BoundedContext::new("catalog").unwrap(), Vec::new()).unwrap()
    }

    fn event(event_type: &str) -> DomainEvent {
        DomainEvent::builder()
            .event_type(event_type)
            .aggregate_id(AggregateId::new())
            .aggregate_type("program")
            .build()
            .unwrap()
    }

    /// Handler that appends `label` to a shared log.
    fn emitter(log: &Arc<Mutex<Vec<String>>>, label: &str) -> impl Handler + 'static {
        let log = Arc::clone(log);
        let label = label.to_string();
        handler_fn(label.clone(), move |_event: DomainEvent| {
            let log = Arc::clone(&log);
            let label = label.clone();
            async move {
                log.lock().unwrap().push(label);
                Reply::Ok
            }
        })
    }

    /// Handler that panics with `message`.
    fn crashing(name: &str, message: &'static str) -> impl Handler + 'static {
        handler_fn(name.to_string(), move |_event: DomainEvent| async move {
            if !message.is_empty() {
                panic!("{message}");
            }
            Reply::Ok
        })
    }

    #[tokio::test]
    async fn test_no_handlers_is_success() {
        let registry = registry();
        assert_eq!(dispatch(&registry, &event("x")).await, Ok(()));
    }

    #[tokio::test]
    async fn test_all_successful_handlers_yield_success() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..5 {
            registry
                .subscribe("x", emitter(&log, &format!("h{i}")), RegistrationOptions::new())
                .await
                .unwrap();
        }

        assert_eq!(dispatch(&registry, &event("x")).await, Ok(()));
        assert_eq!(log.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_priority_order() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry
            .subscribe("x", emitter(&log, "third"), RegistrationOptions::with_priority(30))
            .await
            .unwrap();
        registry
            .subscribe("x", emitter(&log, "first"), RegistrationOptions::with_priority(10))
            .await
            .unwrap();
        registry
            .subscribe("x", emitter(&log, "second"), RegistrationOptions::with_priority(20))
            .await
            .unwrap();

        dispatch(&registry, &event("x")).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_equal_priority_keeps_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = HandlerRegistry::start(
            BoundedContext::new("catalog").unwrap(),
            vec![
                InitialHandler::new("x", emitter(&log, "static-a"), RegistrationOptions::new()),
                InitialHandler::new("x", emitter(&log, "early"), RegistrationOptions::with_priority(1)),
                InitialHandler::new("x", emitter(&log, "static-b"), RegistrationOptions::new()),
            ],
        )
        .unwrap();
        registry
            .subscribe("x", emitter(&log, "dynamic"), RegistrationOptions::new())
            .await
            .unwrap();

        dispatch(&registry, &event("x")).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["early", "static-a", "static-b", "dynamic"]
        );
    }

    #[tokio::test]
    async fn test_explicit_failure_is_reported_verbatim() {
        let registry = registry();
        registry
            .subscribe(
                "y",
                handler_fn("failing", |_event: DomainEvent| async {
                    Err::<(), _>(HandlerError::rejected("handler_failed"))
                }),
                RegistrationOptions::new(),
            )
            .await
            .unwrap();

        let err = dispatch(&registry, &event("y")).await.unwrap_err();

        assert_eq!(err.failures().len(), 1);
        assert_eq!(
            err.failures()[0].error(),
            Some(&HandlerError::rejected("handler_failed"))
        );
    }

    #[tokio::test]
    async fn test_panic_is_wrapped_as_crash() {
        let registry = registry();
        registry
            .subscribe(
                "z",
                crashing("exploding", "boom"),
                RegistrationOptions::new(),
            )
            .await
            .unwrap();

        let err = dispatch(&registry, &event("z")).await.unwrap_err();

        assert_eq!(
            err.failures(),
            &[HandlerFailure::Crashed {
                handler: "exploding".to_string(),
                message: "boom".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_unrecognized_reply_is_wrapped() {
        let registry = registry();
        registry
            .subscribe(
                "x",
                handler_fn("sloppy", |_event: DomainEvent| async {
                    Reply::Unrecognized(serde_json::json!({"status": "maybe"}))
                }),
                RegistrationOptions::new(),
            )
            .await
            .unwrap();

        let err = dispatch(&registry, &event("x")).await.unwrap_err();

        assert!(matches!(
            &err.failures()[0],
            HandlerFailure::UnexpectedReturn { handler, value }
                if handler == "sloppy" && value["status"] == "maybe"
        ));
    }

    #[tokio::test]
    async fn test_mixed_outcomes_run_every_handler() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry
            .subscribe("w", emitter(&log, "ok-1"), RegistrationOptions::with_priority(10))
            .await
            .unwrap();
        registry
            .subscribe(
                "w",
                handler_fn("a", |_event: DomainEvent| async {
                    Err::<(), _>(HandlerError::rejected("a_failed"))
                }),
                RegistrationOptions::with_priority(20),
            )
            .await
            .unwrap();
        registry
            .subscribe(
                "w",
                crashing("b", "b boom"),
                RegistrationOptions::with_priority(30),
            )
            .await
            .unwrap();
        registry
            .subscribe("w", emitter(&log, "ok-2"), RegistrationOptions::with_priority(40))
            .await
            .unwrap();

        let err = dispatch(&registry, &event("w")).await.unwrap_err();

        assert_eq!(
            err.failures(),
            &[
                HandlerFailure::Failed {
                    handler: "a".to_string(),
                    error: HandlerError::rejected("a_failed"),
                },
                HandlerFailure::Crashed {
                    handler: "b".to_string(),
                    message: "b boom".to_string(),
                },
            ]
        );
        assert_eq!(*log.lock().unwrap(), vec!["ok-1", "ok-2"]);
    }

    #[tokio::test]
    async fn test_formatted_panic_message() {
        let registry = registry();
        registry
            .subscribe(
                "x",
                handler_fn("formatted", |event: DomainEvent| async move {
                    if event.event_type() == "x" {
                        panic!("bad event {}", event.event_type());
                    }
                    Reply::Ok
                }),
                RegistrationOptions::new(),
            )
            .await
            .unwrap();

        let err = dispatch(&registry, &event("x")).await.unwrap_err();
        assert!(matches!(
            &err.failures()[0],
            HandlerFailure::Crashed { message, .. } if message == "bad event x"
        ));
    }
}
