//! The submission facade: the thin layer an application actually calls to
//! run an [`Effect`] — `run_sync`, `run_result`, `run_callback`, `fork`,
//! and (with the `tokio` feature) `run_future`.
//!
//! Without the `tokio` feature, every submission runs on a
//! [`effects_interpreter::SynchronousStrategy`] bound to the system clock —
//! no background threads beyond what `run_callback`/`fork` spin up
//! themselves. With it, submissions run on a private background Tokio
//! runtime via `effects-tokio`'s `TokioStrategy`, giving `Fork`/`Race`/
//! `Parallel`/`Timeout` real concurrency.

use effects_core::{Cause, Context, Effect, Fiber, SystemClock, Terminal};
use effects_interpreter::{Strategy, SynchronousStrategy};
use std::fmt;

#[cfg(feature = "tokio")]
fn shared_runtime() -> &'static tokio::runtime::Runtime {
    static RUNTIME: std::sync::OnceLock<tokio::runtime::Runtime> = std::sync::OnceLock::new();
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("effects-runtime's background tokio runtime failed to start")
    })
}

#[cfg(not(feature = "tokio"))]
fn interpret<A, E>(effect: Effect<A, E>) -> Result<A, Cause<E>>
where
    A: Send + 'static,
    E: Send + 'static,
{
    let strategy = SynchronousStrategy::new(SystemClock);
    effects_interpreter::interpret(effect, &Context::empty(), &strategy)
}

#[cfg(feature = "tokio")]
fn interpret<A, E>(effect: Effect<A, E>) -> Result<A, Cause<E>>
where
    A: Send + 'static,
    E: Send + 'static,
{
    let strategy = effects_tokio::TokioStrategy::new(SystemClock, shared_runtime().handle().clone());
    shared_runtime().block_on(async move {
        tokio::task::spawn_blocking(move || effects_interpreter::interpret(effect, &Context::empty(), &strategy))
            .await
            .expect("effect interpretation task panicked")
    })
}

/// Run `effect` to completion and return its result, or panic with the
/// terminal failure's `Display` rendering. The closest Rust equivalent to
/// `runSync`'s "throws" contract.
pub fn run_sync<A, E>(effect: Effect<A, E>) -> A
where
    A: Send + 'static,
    E: Send + fmt::Display + 'static,
{
    tracing::debug!("effect.submit.run_sync");
    match interpret(effect) {
        Ok(v) => v,
        Err(cause) => {
            tracing::error!(cause = %cause.pretty_print(), "effect.submit.run_sync.failed");
            panic!("{}", cause.pretty_print());
        }
    }
}

/// Run `effect` to completion and return its outcome as a [`Result`],
/// collapsing the [`Cause`] tree to a single [`Terminal`] error.
pub fn run_result<A, E>(effect: Effect<A, E>) -> Result<A, Terminal<E>>
where
    A: Send + 'static,
    E: Send + Clone + 'static,
{
    interpret(effect).map_err(|cause| cause.terminal())
}

/// Run `effect` on a background thread and invoke `callback` with its
/// result once interpretation finishes. Returns immediately.
pub fn run_callback<A, E>(effect: Effect<A, E>, callback: impl FnOnce(Result<A, Terminal<E>>) + Send + 'static)
where
    A: Send + 'static,
    E: Send + Clone + 'static,
{
    tracing::debug!("effect.submit.run_callback");
    std::thread::spawn(move || {
        callback(run_result(effect));
    });
}

/// Start `effect` running on a fresh fiber and return immediately with a
/// handle to observe or interrupt it, without waiting for it to finish.
pub fn fork<A, E>(effect: Effect<A, E>) -> Fiber<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    interpret(effect.forked()).unwrap_or_else(|_| unreachable!("forking never fails synchronously"))
}

/// Run `effect` to completion on `strategy` under `ctx`, bypassing this
/// crate's default strategy selection — for callers that already have a
/// `Strategy` they want to reuse (e.g. a `TokioStrategy` bound to an
/// existing runtime handle, or a `SynchronousStrategy` over a
/// `VirtualClock` in a test).
pub fn run_with<A, E>(effect: Effect<A, E>, ctx: &Context, strategy: &dyn Strategy<E>) -> Result<A, Cause<E>>
where
    A: Send + 'static,
    E: Send + 'static,
{
    effects_interpreter::interpret(effect, ctx, strategy)
}

/// `async`-friendly submission: bridges into the ambient Tokio runtime via
/// `spawn_blocking` and returns a future resolving to the same `Result`
/// `run_result` returns. Requires the `tokio` feature and a runtime already
/// running on the calling thread. The closest Rust has to `runPromise`.
#[cfg(feature = "tokio")]
pub async fn run_future<A, E>(effect: Effect<A, E>) -> Result<A, Terminal<E>>
where
    A: Send + 'static,
    E: Send + Clone + 'static,
{
    let strategy = effects_tokio::TokioStrategy::current(SystemClock);
    tokio::task::spawn_blocking(move || {
        effects_interpreter::interpret(effect, &Context::empty(), &strategy).map_err(|cause| cause.terminal())
    })
    .await
    .expect("effect interpretation task panicked")
}
