//! Strategy — binds the interpreter to an execution substrate (spec §7).
//!
//! Every method here is ordinary, blocking Rust: no `async fn`, no
//! `Future`. `effects-tokio`'s `TokioStrategy` gets real concurrency by
//! bridging into Tokio internally (`spawn_blocking` plus a blocking join),
//! so `effects-core` and this crate never have to reason about `Send`
//! bounds on `Future`s or pinning.

use crate::interrupt::Interrupt;
use effects_core::internal::{Raw, RawControl};
use effects_core::{Cause, Clock, Erased};
use std::sync::Arc;
use std::time::Duration;

/// A fully-built, type-erased effect tree plus the context it should run
/// under, packaged as a unit of work a `Strategy` can run on whatever
/// substrate it chooses (the calling thread, a spawned OS thread, a Tokio
/// blocking-pool thread).
pub struct Task<E> {
    pub(crate) raw: Raw<E>,
    pub(crate) ctx: effects_core::Context,
    pub(crate) interrupt: Arc<Interrupt>,
}

impl<E> Task<E> {
    pub(crate) fn new(raw: Raw<E>, ctx: effects_core::Context, interrupt: Arc<Interrupt>) -> Self {
        Self { raw, ctx, interrupt }
    }

    /// The cooperative cancellation signal for this task. A `Strategy` that
    /// runs the task on a separate thread needs this before the task is
    /// consumed, so it can wire up `RawControl::interrupt` ahead of time.
    pub fn interrupt(&self) -> &Arc<Interrupt> {
        &self.interrupt
    }

    /// Decompose into the pieces `run_erased` needs.
    pub(crate) fn into_parts(self) -> (Raw<E>, effects_core::Context, Arc<Interrupt>) {
        (self.raw, self.ctx, self.interrupt)
    }
}

/// What binds the effect algebra to a concrete way of running concurrent
/// work: eager/sequential for `SynchronousStrategy`, real OS threads via
/// `tokio::task::spawn_blocking` for `effects-tokio`'s `TokioStrategy`.
pub trait Strategy<E>: Send + Sync
where
    E: Send + 'static,
{
    /// The clock this strategy's `Sleep`/`Timeout`/`Retry` nodes measure
    /// against.
    fn clock(&self) -> &dyn Clock;

    /// Run `task` to completion, synchronously from the caller's point of
    /// view, per this strategy's concurrency model.
    fn run(&self, task: Task<E>) -> Result<Erased, Cause<E>>;

    /// Start `task` running independently and return a type-erased
    /// join/interrupt/is-done triple (`Effect::forked` wraps this in a
    /// typed [`effects_core::Fiber`] the instant it comes back).
    /// `SynchronousStrategy` runs it eagerly to completion before
    /// returning; `TokioStrategy` spawns it on the blocking pool.
    fn fork(&self, task: Task<E>) -> RawControl<E>;

    /// Run every task to completion and collect results in submission
    /// order. If any task fails, the final result is a `Cause::Parallel`
    /// of every task's cause that didn't succeed — every task is always
    /// run to completion, none are cancelled early.
    fn parallel(&self, tasks: Vec<Task<E>>) -> Result<Vec<Erased>, Cause<E>>;

    /// Run every task concurrently; return the first success, signalling
    /// every other task's `Interrupt` once one wins. If every task fails,
    /// the result is a `Cause::Parallel` of all of their causes.
    fn race(&self, tasks: Vec<Task<E>>) -> Result<Erased, Cause<E>>;

    /// Run `task`, bounding it to `d`. `SynchronousStrategy` can only
    /// measure after the fact (the task already ran to completion by the
    /// time the bound is checked); `TokioStrategy` races a genuine second
    /// thread against a timer and returns as soon as the timer fires.
    fn run_with_timeout(&self, task: Task<E>, d: Duration) -> Result<Erased, Cause<E>>;
}

/// Eager, single-threaded `Strategy`: `fork` runs its task to completion
/// immediately (there is no deferred value to race against), `race` and
/// `parallel` run their children one after another. Suitable for tests and
/// for embeddings that have no use for real concurrency (spec §7's
/// "synchronous" strategy).
pub struct SynchronousStrategy<C: Clock> {
    clock: C,
}

impl<C: Clock> SynchronousStrategy<C> {
    /// A synchronous strategy driven by `clock`.
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C, E> Strategy<E> for SynchronousStrategy<C>
where
    C: Clock,
    E: Send + 'static,
{
    fn clock(&self) -> &dyn Clock {
        &self.clock
    }

    fn run(&self, task: Task<E>) -> Result<Erased, Cause<E>> {
        crate::run_task(task, self)
    }

    fn fork(&self, task: Task<E>) -> RawControl<E> {
        let interrupt = Arc::clone(&task.interrupt);
        let is_cancelled = Arc::clone(&task.interrupt);
        let result = self.run(task);
        RawControl {
            name: "fork",
            join: Box::new(move || result),
            interrupt: Arc::new(move || interrupt.signal()),
            is_done: Arc::new(|| true),
            is_cancelled: Arc::new(move || is_cancelled.is_set()),
        }
    }

    fn parallel(&self, tasks: Vec<Task<E>>) -> Result<Vec<Erased>, Cause<E>> {
        run_parallel_sequentially(self, tasks)
    }

    fn race(&self, tasks: Vec<Task<E>>) -> Result<Erased, Cause<E>> {
        run_race_sequentially(self, tasks)
    }

    fn run_with_timeout(&self, task: Task<E>, d: Duration) -> Result<Erased, Cause<E>> {
        let start = self.clock.monotonic();
        let result = self.run(task);
        if self.clock.monotonic().saturating_sub(start) > d {
            Err(Cause::Fail(effects_core::Failure::Timeout))
        } else {
            result
        }
    }
}

/// Shared by any blocking, non-concurrent strategy: run every task to
/// completion in order, fail only if none succeeded.
pub(crate) fn run_parallel_sequentially<E: Send + 'static>(
    strategy: &dyn Strategy<E>,
    tasks: Vec<Task<E>>,
) -> Result<Vec<Erased>, Cause<E>> {
    let mut values = Vec::with_capacity(tasks.len());
    let mut causes = Vec::new();
    for task in tasks {
        match strategy.run(task) {
            Ok(v) => values.push(v),
            Err(c) => causes.push(c),
        }
    }
    if causes.is_empty() {
        Ok(values)
    } else {
        Err(Cause::parallel(causes))
    }
}

/// Shared by any blocking, non-concurrent strategy: run each task in
/// order, returning the first success found.
pub(crate) fn run_race_sequentially<E: Send + 'static>(
    strategy: &dyn Strategy<E>,
    tasks: Vec<Task<E>>,
) -> Result<Erased, Cause<E>> {
    let mut causes = Vec::new();
    for task in tasks {
        match strategy.run(task) {
            Ok(v) => return Ok(v),
            Err(c) => causes.push(c),
        }
    }
    Err(Cause::parallel(causes))
}
