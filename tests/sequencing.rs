//! End-to-end sequencing, service access, and failure short-circuiting,
//! run through the real trampoline rather than the reference evaluator
//! `effects-core`'s own unit tests use.

use effects_core::{service, succeed, Context, Tag};
use effects_interpreter::{interpret, SynchronousStrategy};

#[derive(Debug, PartialEq)]
struct Db {
    name: &'static str,
}

#[test]
fn service_then_map_resolves_from_context() {
    let tag: Tag<Db> = Tag::new("Db");
    let ctx = Context::empty().insert(tag, Db { name: "primary" });
    let effect = service::<Db, String>(tag).map(|db| db.name);
    let strategy = SynchronousStrategy::new(effects_core::SystemClock);

    assert_eq!(interpret(effect, &ctx, &strategy), Ok("primary"));
}

#[test]
fn missing_service_fails_with_service_not_found() {
    let tag: Tag<Db> = Tag::new("Db");
    let effect = service::<Db, String>(tag).map(|db| db.name);
    let strategy = SynchronousStrategy::new(effects_core::SystemClock);

    let err = interpret(effect, &Context::empty(), &strategy).unwrap_err();
    assert!(err.contains(|f| matches!(f, effects_core::Failure::ServiceNotFound("Db"))));
}

#[test]
fn flat_map_chain_short_circuits_on_first_failure() {
    let ran_second = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let ran = std::sync::Arc::clone(&ran_second);

    let effect = succeed::<i32, String>(1)
        .flat_map(|_| effects_core::fail::<i32, String>("first failure".to_string()))
        .flat_map(move |n| {
            ran.store(true, std::sync::atomic::Ordering::SeqCst);
            succeed(n + 1)
        });

    let result = effects_interpreter::run(effect);
    assert!(result.is_err());
    assert!(!ran_second.load(std::sync::atomic::Ordering::SeqCst));
}

#[test]
fn deeply_chained_flat_maps_do_not_overflow_the_stack() {
    let mut effect = succeed::<i32, String>(0);
    for _ in 0..100_000 {
        effect = effect.flat_map(|n| succeed(n + 1));
    }
    assert_eq!(effects_interpreter::run(effect), Ok(100_000));
}
