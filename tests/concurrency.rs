//! Real concurrency via `effects-tokio`'s `TokioStrategy`: forked fibers
//! that actually run on a separate thread, `Parallel` that preserves
//! submission order, and `Race` that returns the first winner.

use effects_core::{fail, sleep_for, succeed, Context};
use effects_interpreter::interpret;
use effects_tokio::TokioStrategy;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn forked_fiber_runs_independently_and_can_be_awaited() {
    let strategy = TokioStrategy::current(effects_core::SystemClock);
    let effect = succeed::<i32, String>(1).map(|n| n + 1).forked();

    let fiber = tokio::task::spawn_blocking(move || interpret(effect, &Context::empty(), &strategy))
        .await
        .unwrap()
        .expect("fork never fails synchronously");

    assert_eq!(fiber.await_result(), Ok(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn race_resolves_to_the_faster_sleeper() {
    let strategy = TokioStrategy::current(effects_core::SystemClock);
    let fast: effects_core::Effect<&'static str, String> =
        sleep_for(Duration::from_millis(5)).map(|_| "fast");
    let slow: effects_core::Effect<&'static str, String> =
        sleep_for(Duration::from_millis(200)).map(|_| "slow");
    let effect = effects_core::race_all(vec![fast, slow]);

    let result = tokio::task::spawn_blocking(move || interpret(effect, &Context::empty(), &strategy))
        .await
        .unwrap();

    assert_eq!(result, Ok("fast"));
}

#[tokio::test(flavor = "multi_thread")]
async fn parallel_children_run_concurrently_not_sequentially() {
    let strategy = TokioStrategy::current(effects_core::SystemClock);
    let children: Vec<effects_core::Effect<u32, String>> = (0..4)
        .map(|i| sleep_for::<String>(Duration::from_millis(50)).map(move |_| i))
        .collect();
    let effect = effects_core::all_in_parallel(children);

    let start = std::time::Instant::now();
    let result = tokio::task::spawn_blocking(move || interpret(effect, &Context::empty(), &strategy))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(result, Ok(vec![0, 1, 2, 3]));
    // Four 50ms sleeps running concurrently finish well under their 200ms
    // sequential sum.
    assert!(elapsed < Duration::from_millis(180), "{elapsed:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn parallel_cancels_the_rest_on_first_failure() {
    let strategy = TokioStrategy::current(effects_core::SystemClock);
    let quick_failure: effects_core::Effect<u32, String> = fail("boom".to_string());
    let long_runner: effects_core::Effect<u32, String> =
        sleep_for(Duration::from_millis(300)).map(|_| 1);
    let effect = effects_core::all_in_parallel(vec![quick_failure, long_runner]);

    let start = std::time::Instant::now();
    let result = tokio::task::spawn_blocking(move || interpret(effect, &Context::empty(), &strategy))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(result.is_err());
    // The failing child is near-instant; the surviving sibling should have
    // been cancelled rather than waited out for its full 300ms sleep.
    assert!(elapsed < Duration::from_millis(250), "{elapsed:?}");
}
