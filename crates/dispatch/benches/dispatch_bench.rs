use std::sync::Arc;

use async_trait::async_trait;
use broadcast::BroadcastChannel;
use common::BoundedContext;
use criterion::{Criterion, criterion_group, criterion_main};
use dispatch::{
    HandlerError, HandlerRegistry, InitialHandler, Promoter, PromotionRule, RegistrationOptions,
    Reply, UiNotifier, dispatch, handler_fn,
};
use events::{AggregateId, DomainEvent};

fn make_event(event_type: &str) -> DomainEvent {
    DomainEvent::builder()
        .event_type(event_type)
        .aggregate_id(AggregateId::new())
        .aggregate_type("user")
        .field("email", "bench@example.com")
        .build()
        .unwrap()
}

/// Channel that accepts and discards everything, so iterations don't accumulate state.
struct DiscardChannel;

#[async_trait]
impl BroadcastChannel for DiscardChannel {
    async fn publish(&self, _topic: &str, _payload: serde_json::Value) -> broadcast::Result<()> {
        Ok(())
    }
}

fn context() -> BoundedContext {
    BoundedContext::new("accounts").unwrap()
}

/// Registry with `n` no-op handlers on `bench_event`, alternating priorities.
fn noop_registry(n: usize) -> HandlerRegistry {
    let initial = (0..n).map(|i| {
        InitialHandler::new(
            "bench_event",
            handler_fn(format!("noop-{i}"), |_event: DomainEvent| async { Reply::Ok }),
            RegistrationOptions::with_priority((i % 3) as i32),
        )
    });
    HandlerRegistry::start(context(), initial).unwrap()
}

fn bench_dispatch_no_handlers(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = rt.block_on(async { noop_registry(0) });
    let event = make_event("bench_event");

    c.bench_function("dispatch/no_handlers", |b| {
        b.iter(|| rt.block_on(dispatch(&registry, &event)).unwrap());
    });
}

fn bench_dispatch_ten_handlers(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = rt.block_on(async { noop_registry(10) });
    let event = make_event("bench_event");

    c.bench_function("dispatch/10_handlers", |b| {
        b.iter(|| rt.block_on(dispatch(&registry, &event)).unwrap());
    });
}

fn bench_dispatch_with_failures(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = rt.block_on(async {
        let registry = noop_registry(5);
        for i in 0..5 {
            registry
                .subscribe(
                    "bench_event",
                    handler_fn(format!("failing-{i}"), |_event: DomainEvent| async {
                        Err::<(), _>(HandlerError::rejected("bench"))
                    }),
                    RegistrationOptions::new(),
                )
                .await
                .unwrap();
        }
        registry
    });
    let event = make_event("bench_event");

    c.bench_function("dispatch/5_ok_5_failed", |b| {
        b.iter(|| rt.block_on(dispatch(&registry, &event)).unwrap_err());
    });
}

fn bench_promote_and_notify(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let channel: Arc<dyn BroadcastChannel> = Arc::new(DiscardChannel);
    let registry = rt.block_on(async {
        HandlerRegistry::builder(context())
            .handlers(
                Promoter::new(context(), Arc::clone(&channel))
                    .rule(PromotionRule::best_effort("user_registered").with_fields(&["email"]))
                    .into_initial_handlers(RegistrationOptions::new()),
            )
            .handler(InitialHandler::new(
                "user_registered",
                UiNotifier::new(Arc::clone(&channel)),
                RegistrationOptions::new(),
            ))
            .start()
            .unwrap()
    });
    let event = make_event("user_registered");

    c.bench_function("dispatch/promote_and_notify", |b| {
        b.iter(|| rt.block_on(dispatch(&registry, &event)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_dispatch_no_handlers,
    bench_dispatch_ten_handlers,
    bench_dispatch_with_failures,
    bench_promote_and_notify,
);
criterion_main!(benches);
