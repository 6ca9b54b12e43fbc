//! Layer composition and managed-resource (`Scope`) behavior, run through
//! the real interpreter.

use effects_core::{service, succeed, Context, Effect, Layer, Scope, Tag};
use effects_interpreter::run;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Config {
    retries: u32,
}

struct Logger {
    prefix: &'static str,
}

#[test]
fn layer_and_then_lets_the_second_layer_see_the_first() {
    let config_tag: Tag<Config> = Tag::new("Config");
    let logger_tag: Tag<Logger> = Tag::new("Logger");

    let config_layer: Layer<String> =
        Layer::from_value(Context::empty().insert(config_tag, Config { retries: 3 }));
    let logger_layer: Layer<String> = Layer::from_effect(move || {
        service::<Config, String>(config_tag).map(move |config| {
            let prefix = if config.retries > 0 { "retrying" } else { "strict" };
            Context::empty().insert(logger_tag, Logger { prefix })
        })
    });

    let combined = config_layer.and_then(logger_layer);
    let effect: Effect<&'static str, String> =
        service::<Logger, String>(logger_tag).map(|logger| logger.prefix);

    assert_eq!(run(combined.provide_to(effect)), Ok("retrying"));
}

#[test]
fn layer_combine_with_merges_independent_bindings() {
    let config_tag: Tag<Config> = Tag::new("Config");
    let logger_tag: Tag<Logger> = Tag::new("Logger");

    let config_layer: Layer<String> =
        Layer::from_value(Context::empty().insert(config_tag, Config { retries: 1 }));
    let logger_layer: Layer<String> =
        Layer::from_value(Context::empty().insert(logger_tag, Logger { prefix: "log" }));
    let combined = config_layer.combine_with(logger_layer);

    let effect: Effect<(u32, &'static str), String> = service::<Config, String>(config_tag)
        .flat_map(move |config| {
            service::<Logger, String>(logger_tag).map(move |logger| (config.retries, logger.prefix))
        });

    assert_eq!(run(combined.provide_to(effect)), Ok((1, "log")));
}

#[test]
fn scoped_resource_is_released_after_the_body_completes() {
    let released = Arc::new(AtomicBool::new(false));
    let released_in_finalizer = Arc::clone(&released);

    let effect: Effect<i32, String> = Effect::scoped(move |scope: &Scope<String>| {
        let handle = scope.acquire_resource(7, move |_| {
            released_in_finalizer.store(true, Ordering::SeqCst);
            Ok(())
        });
        succeed(handle)
    });

    assert_eq!(run(effect), Ok(7));
    assert!(released.load(Ordering::SeqCst));
}

#[test]
fn scoped_resource_is_released_even_when_the_body_fails() {
    let released = Arc::new(AtomicBool::new(false));
    let released_in_finalizer = Arc::clone(&released);

    let effect: Effect<i32, String> = Effect::scoped(move |scope: &Scope<String>| {
        scope.acquire_resource((), move |_| {
            released_in_finalizer.store(true, Ordering::SeqCst);
            Ok(())
        });
        effects_core::fail("body failed".to_string())
    });

    assert!(run(effect).is_err());
    assert!(released.load(Ordering::SeqCst));
}
