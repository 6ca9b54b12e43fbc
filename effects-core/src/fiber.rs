//! Fiber — the typed handle returned by [`crate::Effect::forked`] (spec §7's
//! `ExecutionControl`).
//!
//! The interpreter that actually runs a forked effect lives in
//! `effects-interpreter`, a downstream crate, and has no way to know the
//! fork's success type `A` (every node it walks is type-erased). It
//! produces a [`RawControl`] instead — the same join/interrupt/is-done
//! shape with an erased success value — and `Effect::forked` wraps that in
//! a typed `Fiber<A, E>` the instant it comes back, so ordinary call sites
//! never see the erasure.

use crate::cause::Cause;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A type-erased join/interrupt/is-done triple, as produced by whatever
/// `Strategy` started the fiber. Not meant for ordinary callers — see
/// [`Fiber`].
pub struct RawControl<E> {
    /// A diagnostic label for tracing/log correlation. Every fork currently
    /// produces `"fork"`; there is no public combinator yet for naming one
    /// individually.
    pub name: &'static str,
    /// Block until the fiber finishes and return its outcome.
    pub join: Box<dyn FnOnce() -> Result<Box<dyn Any + Send>, Cause<E>> + Send>,
    /// Request cooperative cancellation.
    pub interrupt: Arc<dyn Fn() + Send + Sync>,
    /// True once the fiber has finished.
    pub is_done: Arc<dyn Fn() -> bool + Send + Sync>,
    /// True once this fiber's own cooperative cancellation has been
    /// requested (whether or not it has taken effect yet).
    pub is_cancelled: Arc<dyn Fn() -> bool + Send + Sync>,
}

/// A handle to a fiber started by [`crate::Effect::forked`] (spec §6's
/// `ExecutionControl`: `await`, `cancel`, `isRunning`, `isCompleted`,
/// `isCancelled`).
///
/// `await_result` blocks the calling thread until the fiber completes;
/// `interrupt` requests cooperative cancellation; `is_running`/
/// `is_completed`/`is_cancelled` poll without blocking.
pub struct Fiber<A, E> {
    control: RawControl<E>,
    _marker: PhantomData<fn() -> A>,
}

impl<A, E> Fiber<A, E>
where
    A: Send + 'static,
{
    /// Wrap a type-erased control triple as a typed fiber handle. Not part
    /// of the stable public API — for `effects-interpreter`'s use via
    /// `Effect::forked`'s construction.
    #[doc(hidden)]
    pub fn from_control(control: RawControl<E>) -> Self {
        Self {
            control,
            _marker: PhantomData,
        }
    }

    /// A diagnostic label for this fiber, for tracing/log correlation.
    pub fn name(&self) -> &'static str {
        self.control.name
    }

    /// Block the calling thread until the fiber finishes, returning its
    /// outcome.
    pub fn await_result(self) -> Result<A, Cause<E>> {
        (self.control.join)().map(|erased| {
            *erased
                .downcast::<A>()
                .unwrap_or_else(|_| panic!("fiber type erasure invariant violated"))
        })
    }

    /// Request cooperative cancellation of the fiber.
    pub fn interrupt(&self) {
        (self.control.interrupt)();
    }

    /// True once the fiber has finished (successfully, with a failure, or
    /// interrupted).
    pub fn is_done(&self) -> bool {
        (self.control.is_done)()
    }

    /// True while the fiber has not yet finished.
    pub fn is_running(&self) -> bool {
        !self.is_done()
    }

    /// True once the fiber has finished, regardless of outcome. Alias for
    /// [`Fiber::is_done`] under the spec's `isCompleted` name.
    pub fn is_completed(&self) -> bool {
        self.is_done()
    }

    /// True once cooperative cancellation has been requested for this
    /// fiber (via [`Fiber::interrupt`], or by an enclosing `Race`/`Timeout`/
    /// `Parallel` that cancelled it).
    pub fn is_cancelled(&self) -> bool {
        (self.control.is_cancelled)()
    }
}

impl<A, E> fmt::Debug for Fiber<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("name", &self.control.name)
            .field("is_done", &self.is_done())
            .field("is_cancelled", &self.is_cancelled())
            .finish()
    }
}
