//! `TokioStrategy` — a [`Strategy`] that gives `Fork`, `Race`, `Parallel`,
//! and `Timeout` genuine thread-pool concurrency instead of
//! `SynchronousStrategy`'s sequential fallback.
//!
//! Every `Strategy` method stays ordinary, blocking Rust (no `async fn`) —
//! `effects-core` and `effects-interpreter` never have to reason about
//! `Send` bounds on futures or pinning. Concurrency comes from bridging out
//! to Tokio internally: each task runs on the blocking pool via
//! [`tokio::task::spawn_blocking`], joined back through a `JoinSet`.

use effects_core::{Cause, Clock, Erased, Failure};
use effects_interpreter::{Interrupt, Strategy, Task};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// A [`Strategy`] backed by a Tokio runtime. `fork` spawns onto the
/// blocking pool and returns immediately; `race`/`parallel` spawn every
/// child at once and join concurrently; `run_with_timeout` races a genuine
/// timer against the task instead of measuring after the fact.
///
/// Cheap to clone: holds only a [`tokio::runtime::Handle`] (a handle, not
/// the runtime itself) and an `Arc`'d clock.
pub struct TokioStrategy<C> {
    clock: Arc<C>,
    handle: tokio::runtime::Handle,
}

impl<C: Clock> TokioStrategy<C> {
    /// Bind a strategy to `clock`, running work on `handle`'s runtime.
    pub fn new(clock: C, handle: tokio::runtime::Handle) -> Self {
        Self {
            clock: Arc::new(clock),
            handle,
        }
    }

    /// Bind a strategy to `clock`, running work on the runtime the calling
    /// thread is already inside.
    pub fn current(clock: C) -> Self {
        Self::new(clock, tokio::runtime::Handle::current())
    }
}

impl<C> Clone for TokioStrategy<C> {
    fn clone(&self) -> Self {
        Self {
            clock: Arc::clone(&self.clock),
            handle: self.handle.clone(),
        }
    }
}

/// A fiber that panicked on the blocking pool is treated as interrupted: it
/// produced no typed outcome and there is no `E` value to report it as.
fn join_error_to_cause<E>(err: tokio::task::JoinError) -> Cause<E> {
    tracing::error!(panicked = err.is_panic(), "effect.fork.join_error");
    Cause::Interrupt
}

impl<C, E> Strategy<E> for TokioStrategy<C>
where
    C: Clock + 'static,
    E: Send + 'static,
{
    fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    fn run(&self, task: Task<E>) -> Result<Erased, Cause<E>> {
        effects_interpreter::run_task(task, self)
    }

    fn fork(&self, task: Task<E>) -> effects_core::internal::RawControl<E> {
        let interrupt = Arc::clone(task.interrupt());
        let is_cancelled = Arc::clone(task.interrupt());
        let strategy = self.clone();
        let done = Arc::new(AtomicBool::new(false));
        let done_writer = Arc::clone(&done);

        let join_handle = self.handle.spawn_blocking(move || {
            let outcome = effects_interpreter::run_task(task, &strategy);
            done_writer.store(true, Ordering::SeqCst);
            outcome
        });
        let handle = self.handle.clone();

        effects_core::internal::RawControl {
            name: "fork",
            join: Box::new(move || handle.block_on(join_handle).unwrap_or_else(|e| Err(join_error_to_cause(e)))),
            interrupt: Arc::new(move || interrupt.signal()),
            is_done: Arc::new(move || done.load(Ordering::SeqCst)),
            is_cancelled: Arc::new(move || is_cancelled.is_set()),
        }
    }

    fn parallel(&self, tasks: Vec<Task<E>>) -> Result<Vec<Erased>, Cause<E>> {
        let count = tasks.len();
        let interrupts: Vec<Arc<Interrupt>> = tasks.iter().map(|t| Arc::clone(t.interrupt())).collect();
        let mut set = JoinSet::new();
        for (index, task) in tasks.into_iter().enumerate() {
            let strategy = self.clone();
            set.spawn_blocking(move || (index, effects_interpreter::run_task(task, &strategy)));
        }

        let mut slots: Vec<Option<Erased>> = (0..count).map(|_| None).collect();
        let mut causes = Vec::new();
        while let Some(joined) = self.handle.block_on(set.join_next()) {
            match joined {
                Ok((index, Ok(v))) => slots[index] = Some(v),
                Ok((_, Err(cause))) => {
                    causes.push(cause);
                    // First failure: cancel every sibling still running and
                    // stop waiting on the rest (spec §4.2's Parallel handler).
                    for interrupt in &interrupts {
                        interrupt.signal();
                    }
                    set.abort_all();
                    break;
                }
                Err(e) => causes.push(join_error_to_cause(e)),
            }
        }

        if causes.is_empty() {
            Ok(slots.into_iter().map(|slot| slot.expect("every slot filled when there are no causes")).collect())
        } else {
            Err(Cause::parallel(causes))
        }
    }

    fn race(&self, tasks: Vec<Task<E>>) -> Result<Erased, Cause<E>> {
        let interrupts: Vec<Arc<Interrupt>> = tasks.iter().map(|t| Arc::clone(t.interrupt())).collect();
        let mut set = JoinSet::new();
        for task in tasks {
            let strategy = self.clone();
            set.spawn_blocking(move || effects_interpreter::run_task(task, &strategy));
        }

        let mut causes = Vec::new();
        let winner = loop {
            match self.handle.block_on(set.join_next()) {
                None => break None,
                Some(Ok(Ok(v))) => break Some(v),
                Some(Ok(Err(cause))) => causes.push(cause),
                Some(Err(e)) => causes.push(join_error_to_cause(e)),
            }
        };

        for interrupt in &interrupts {
            interrupt.signal();
        }
        set.abort_all();

        match winner {
            Some(v) => Ok(v),
            None => Err(Cause::parallel(causes)),
        }
    }

    fn run_with_timeout(&self, task: Task<E>, d: Duration) -> Result<Erased, Cause<E>> {
        let interrupt = Arc::clone(task.interrupt());
        let strategy = self.clone();
        let join_handle = self.handle.spawn_blocking(move || effects_interpreter::run_task(task, &strategy));

        let outcome = self.handle.block_on(async { tokio::time::timeout(d, join_handle).await });
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(join_error_to_cause(join_err)),
            Err(_elapsed) => {
                tracing::debug!(millis = d.as_millis() as u64, "effect.timeout.raced_out");
                interrupt.signal();
                Err(Cause::Fail(Failure::Timeout))
            }
        }
    }
}
