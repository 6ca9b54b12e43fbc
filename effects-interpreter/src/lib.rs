//! Trampoline interpreter for the `effects-core` effect algebra.
//!
//! [`interpret`] is the typed entry point: give it an [`Effect`] and a
//! [`Strategy`] and it walks the tree to completion, dispatching
//! concurrency-sensitive nodes (`Fork`, `Race`, `Parallel`, `Timeout`) to
//! whatever execution substrate the strategy provides. Everything in this
//! crate is ordinary, blocking Rust — no `async fn`, no `Future` — so a
//! caller that wants real concurrency supplies a `Strategy` that bridges
//! out to one (`effects-tokio`'s `TokioStrategy`), while tests and
//! single-threaded embeddings can use [`SynchronousStrategy`] as-is.

mod interpreter;
mod interrupt;
mod strategy;

pub use interrupt::Interrupt;
pub use strategy::{Strategy, SynchronousStrategy, Task};

use effects_core::{Cause, Context, Effect, Erased};

/// Run a single [`Task`] through the trampoline, dispatching any nested
/// `Fork`/`Race`/`Parallel`/`Timeout` nodes back to `strategy`. This is the
/// building block every `Strategy` impl's own `run` method delegates to
/// (`SynchronousStrategy` runs it on the calling thread; `effects-tokio`'s
/// `TokioStrategy` runs it on the blocking pool) — exposed so downstream
/// crates can implement new strategies without reaching into this crate's
/// private modules.
pub fn run_task<E: Send + 'static>(task: Task<E>, strategy: &dyn Strategy<E>) -> Result<Erased, Cause<E>> {
    let (raw, ctx, interrupt) = task.into_parts();
    interpreter::run_erased(raw, &ctx, strategy, &interrupt)
}

/// Run `effect` to completion under `ctx`, dispatching concurrency-sensitive
/// nodes to `strategy`. This is the typed counterpart to
/// `effects_core::internal::Raw` walking: it performs the final downcast
/// back to `A` so callers never see the erasure underneath.
pub fn interpret<A, E>(effect: Effect<A, E>, ctx: &Context, strategy: &dyn Strategy<E>) -> Result<A, Cause<E>>
where
    A: Send + 'static,
    E: Send + 'static,
{
    let interrupt = Interrupt::new();
    let erased = interpreter::run_erased(effect.into_raw(), ctx, strategy, &interrupt)?;
    Ok(*erased
        .downcast::<A>()
        .unwrap_or_else(|_| panic!("effect interpretation produced the wrong type")))
}

/// Run `effect` to completion against a fresh, empty [`Context`] and a
/// [`SynchronousStrategy`] driven by the system clock. Convenient for tests
/// and for small programs that have no use for dependency injection or real
/// concurrency.
pub fn run<A, E>(effect: Effect<A, E>) -> Result<A, Cause<E>>
where
    A: Send + 'static,
    E: Send + 'static,
{
    let strategy = SynchronousStrategy::new(effects_core::SystemClock);
    interpret(effect, &Context::empty(), &strategy)
}
