//! Effect — the closed algebra of effect descriptions (spec §4).
//!
//! `Effect<A, E>` is data, not a future: building one never runs anything.
//! Interior to the crate, every node is stored in a single *type-erased*
//! representation ([`Raw`]) so the whole algebra stays one closed enum
//! (spec §9's "single closed sum type" design note) even though a `FlatMap`
//! or `Parallel` node's children may produce a different success type than
//! their parent. `Effect<A, E>` is a thin, statically-typed handle around a
//! `Raw<E>` plus a `PhantomData<A>` marker; the erasure is invisible at the
//! public API.
//!
//! `effects-interpreter` is the only other crate that looks inside `Raw` —
//! everything here is constructed through the typed methods below, so the
//! downcasts performed when interpreting a node always succeed by
//! construction.

use crate::cause::{Cause, Failure};
use crate::context::Context;
use crate::either::Either;
use crate::layer::Layer;
use crate::schedule::Schedule;
use crate::scope::Scope;
use std::any::Any;
use std::marker::PhantomData;
use std::time::Duration;

/// A type-erased successful value, boxed so nodes with different success
/// types can share one node representation.
pub type Erased = Box<dyn Any + Send>;

fn erase<A: Send + 'static>(value: A) -> Erased {
    Box::new(value)
}

fn unerase<A: Send + 'static>(value: Erased) -> A {
    *value
        .downcast::<A>()
        .unwrap_or_else(|_| panic!("effect type erasure invariant violated"))
}

/// A predicate selecting which failures a `Catch` handles. Built from a
/// closure rather than exposed as a trait so ordinary predicates and
/// type-narrowing checks both fit through the same door (spec §4.2:
/// "errorSelector is either a type tag or a predicate").
#[derive(Clone)]
pub struct Selector<E> {
    matches: std::sync::Arc<dyn Fn(&Failure<E>) -> bool + Send + Sync>,
}

impl<E: 'static> Selector<E> {
    /// Matches every failure, including `ServiceNotFound` and `Timeout`.
    pub fn any() -> Self {
        Self {
            matches: std::sync::Arc::new(|_| true),
        }
    }

    /// Matches only `Failure::Error(e)` for which `pred(e)` is true.
    pub fn matching(pred: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self {
            matches: std::sync::Arc::new(move |f| matches!(f, Failure::Error(e) if pred(e))),
        }
    }

    /// True iff this selector matches `failure`. Used by `effects-interpreter`
    /// to decide whether a `Catch` node handles a given failure.
    pub fn matches(&self, failure: &Failure<E>) -> bool {
        (self.matches)(failure)
    }
}

#[doc(hidden)]
#[allow(missing_docs)]
pub type BoxedSync<E> = Box<dyn FnOnce() -> Result<Erased, E> + Send>;
#[doc(hidden)]
#[allow(missing_docs)]
pub type BoxedSuspend<E> = Box<dyn FnOnce() -> Raw<E> + Send>;
#[doc(hidden)]
#[allow(missing_docs)]
pub type BoxedContinuation<E> = Box<dyn FnOnce(Erased) -> Raw<E> + Send>;
#[doc(hidden)]
#[allow(missing_docs)]
pub type BoxedRecover<E> = Box<dyn FnOnce(Failure<E>) -> Raw<E> + Send>;
#[doc(hidden)]
#[allow(missing_docs)]
pub type BoxedFallback<E> = Box<dyn FnOnce() -> Raw<E> + Send>;
#[doc(hidden)]
#[allow(missing_docs)]
pub type BoxedLookup<E> = Box<dyn Fn(&Context) -> Result<Erased, &'static str> + Send + Sync>;
#[doc(hidden)]
#[allow(missing_docs)]
pub type BoxedScoped<E> = Box<dyn FnOnce(&Scope<E>) -> Raw<E> + Send>;
#[doc(hidden)]
#[allow(missing_docs)]
pub type BoxedRetryFactory<E> = Box<dyn Fn() -> Raw<E> + Send + Sync>;

/// The type-erased effect tree. Not part of the stable public API —
/// reachable only through `effects_core::internal` for `effects-interpreter`
/// to walk; every other caller builds and consumes [`Effect`] instead.
#[doc(hidden)]
#[allow(missing_docs)]
pub enum Raw<E> {
    Success(Erased),
    Failure(Cause<E>),
    Sync(BoxedSync<E>),
    Suspend(BoxedSuspend<E>),
    FlatMap(Box<Raw<E>>, BoxedContinuation<E>),
    Catch(Box<Raw<E>>, Selector<E>, BoxedRecover<E>),
    OrElse(Box<Raw<E>>, BoxedFallback<E>),
    Ensuring(Box<Raw<E>>, Box<Raw<E>>),
    Timeout(Box<Raw<E>>, Duration),
    Retry(BoxedRetryFactory<E>, Schedule),
    Sleep(Duration),
    CurrentTime,
    Race(Vec<Raw<E>>),
    Parallel(Vec<Raw<E>>),
    Fork(Box<Raw<E>>),
    ServiceAccess(BoxedLookup<E>),
    ProvideContext(Box<Raw<E>>, Context),
    ProvideLayer(Box<Raw<E>>, Layer<E>),
    Scoped(BoxedScoped<E>),
    Never,
}

/// A description of an effectful computation that produces `A` on success
/// or fails with `E` (or an interpreter-level [`Failure`] wrapping it).
/// Building one is free; nothing runs until a `Strategy`/interpreter in
/// `effects-interpreter` walks the tree.
pub struct Effect<A, E> {
    raw: Raw<E>,
    _marker: PhantomData<fn() -> A>,
}

impl<A, E> Effect<A, E> {
    /// Wrap a type-erased tree as a typed `Effect<A, E>`. Not part of the
    /// stable public API — for `effects-interpreter`'s use only; every
    /// caller outside this crate and the interpreter builds effects
    /// through the constructors and combinators instead.
    #[doc(hidden)]
    pub fn from_raw(raw: Raw<E>) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Unwrap to the type-erased tree. See [`Effect::from_raw`].
    #[doc(hidden)]
    pub fn into_raw(self) -> Raw<E> {
        self.raw
    }
}

// --- constructors -----------------------------------------------------

/// An effect that immediately succeeds with `value`.
pub fn succeed<A: Send + 'static, E>(value: A) -> Effect<A, E> {
    Effect::from_raw(Raw::Success(erase(value)))
}

/// An effect that immediately fails with the domain error `err`.
pub fn fail<A, E>(err: E) -> Effect<A, E> {
    Effect::from_raw(Raw::Failure(Cause::fail(err)))
}

/// An effect that immediately fails with an arbitrary [`Cause`], including
/// `Interrupt` or an interpreter-level [`Failure`].
pub fn fail_cause<A, E>(cause: Cause<E>) -> Effect<A, E> {
    Effect::from_raw(Raw::Failure(cause))
}

/// Lift an ordinary blocking computation. Runs exactly once, synchronously,
/// when the interpreter reaches this node (spec §4.1).
pub fn sync<A, E>(f: impl FnOnce() -> Result<A, E> + Send + 'static) -> Effect<A, E>
where
    A: Send + 'static,
{
    Effect::from_raw(Raw::Sync(Box::new(move || f().map(erase))))
}

/// Defer construction of an effect until interpretation reaches this node.
/// Unlike `sync`, the deferred closure itself builds another `Effect`
/// rather than a plain value — used to branch on state that may change
/// between when the effect is built and when it runs.
pub fn suspend<A, E>(f: impl FnOnce() -> Effect<A, E> + Send + 'static) -> Effect<A, E>
where
    A: Send + 'static,
    E: 'static,
{
    Effect::from_raw(Raw::Suspend(Box::new(move || f().into_raw())))
}

/// An effect that never completes — no success, no failure, no
/// interruption. Folding any combinator over it (`map`, `flat_map`,
/// `catch`) yields another effect that likewise never completes, since the
/// continuation is never invoked (spec §4.2).
pub fn never<A, E>() -> Effect<A, E> {
    Effect::from_raw(Raw::Never)
}

/// Suspend the fiber for `d`, using whichever [`crate::Clock`] the active
/// `Strategy` is bound to.
pub fn sleep_for<E>(d: Duration) -> Effect<(), E> {
    Effect::from_raw(Raw::Sleep(d))
}

/// Read the current wall-clock time (milliseconds since the Unix epoch, or
/// since a [`crate::VirtualClock`]'s own epoch under tests) from whichever
/// [`crate::Clock`] the active `Strategy` is bound to (spec §6's
/// `currentTimeMillis`).
pub fn current_time_millis<E>() -> Effect<u64, E> {
    Effect::from_raw(Raw::CurrentTime)
}

/// Look up a service bound in the ambient [`Context`]. Fails with
/// `Failure::ServiceNotFound(tag.name())` if nothing is bound.
pub fn service<T, E>(tag: crate::context::Tag<T>) -> Effect<std::sync::Arc<T>, E>
where
    T: Send + Sync + 'static,
    E: 'static,
{
    let lookup: BoxedLookup<E> = Box::new(move |ctx: &Context| {
        ctx.get(tag)
            .map(|v| erase(v))
            .ok_or_else(|| tag.name())
    });
    Effect::from_raw(Raw::ServiceAccess(lookup))
}

/// Lift an already-computed [`Either`]: `Left` becomes a domain failure,
/// `Right` becomes a success.
pub fn from_either<A, E>(value: Either<E, A>) -> Effect<A, E>
where
    A: Send + 'static,
{
    match value {
        Either::Left(err) => fail(err),
        Either::Right(ok) => succeed(ok),
    }
}

/// Lift an `Option`: `None` fails with the supplied error, `Some` succeeds.
pub fn from_option<A, E>(value: Option<A>, if_none: impl FnOnce() -> E) -> Effect<A, E>
where
    A: Send + 'static,
{
    match value {
        Some(ok) => succeed(ok),
        None => fail(if_none()),
    }
}

/// Run an effect only if `cond` is true, otherwise succeed with `()`
/// without evaluating it.
pub fn when<E>(cond: bool, effect: impl FnOnce() -> Effect<(), E>) -> Effect<(), E> {
    if cond {
        effect()
    } else {
        succeed(())
    }
}

/// Run every effect to completion concurrently (subject to the active
/// `Strategy`'s concurrency model) and collect results in submission
/// order. Fails as soon as any child fails or is interrupted; the other
/// children's causes are folded into a `Parallel` cause alongside it
/// (spec §4.4).
pub fn all_in_parallel<A, E>(effects: Vec<Effect<A, E>>) -> Effect<Vec<A>, E>
where
    A: Send + 'static,
    E: 'static,
{
    let children = effects.into_iter().map(Effect::into_raw).collect();
    // The interpreter can't know `A` when it runs `Raw::Parallel` — it
    // hands back a `Vec<Erased>` (one erased child result per submission
    // slot). Un-erase each element here, where `A` is still in scope.
    let cont: BoxedContinuation<E> = Box::new(|erased: Erased| {
        let values = *erased
            .downcast::<Vec<Erased>>()
            .unwrap_or_else(|_| panic!("parallel effect did not produce a Vec<Erased>"));
        let typed: Vec<A> = values.into_iter().map(unerase::<A>).collect();
        Raw::Success(erase(typed))
    });
    Effect::from_raw(Raw::FlatMap(Box::new(Raw::Parallel(children)), cont))
}

/// Run every effect concurrently; succeed with the first to succeed and
/// interrupt the rest. Fails only if every child fails (spec §4.4).
pub fn race_all<A, E>(effects: Vec<Effect<A, E>>) -> Effect<A, E> {
    Effect::from_raw(Raw::Race(effects.into_iter().map(Effect::into_raw).collect()))
}

/// Re-run the effect produced by `make` from scratch according to
/// `schedule` whenever it fails with a domain error (spec §4.3).
/// Interruption and interpreter-level failures (`ServiceNotFound`) are
/// never retried. `make` is called once per attempt — an `Effect` tree is a
/// single-use description, so retrying means rebuilding it, not replaying
/// it.
pub fn retry<A, E>(
    make: impl Fn() -> Effect<A, E> + Send + Sync + 'static,
    schedule: Schedule,
) -> Effect<A, E>
where
    A: Send + 'static,
    E: 'static,
{
    let factory: BoxedRetryFactory<E> = Box::new(move || make().into_raw());
    Effect::from_raw(Raw::Retry(factory, schedule))
}

// --- combinators --------------------------------------------------------

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: 'static,
{
    /// Transform a successful result. Never touches a failure.
    pub fn map<B>(self, f: impl FnOnce(A) -> B + Send + 'static) -> Effect<B, E>
    where
        B: Send + 'static,
    {
        self.flat_map(move |a| succeed(f(a)))
    }

    /// Sequence: run `self`, then feed its result into `f` to build the
    /// next effect. The fundamental sequencing combinator everything else
    /// (`map`, `then`, `tap`) is defined in terms of (spec §4.2).
    pub fn flat_map<B>(self, f: impl FnOnce(A) -> Effect<B, E> + Send + 'static) -> Effect<B, E>
    where
        B: Send + 'static,
    {
        let cont: BoxedContinuation<E> = Box::new(move |erased| f(unerase(erased)).into_raw());
        Effect::from_raw(Raw::FlatMap(Box::new(self.raw), cont))
    }

    /// Run `self`, discard its result, then run `next`.
    pub fn then<B>(self, next: Effect<B, E>) -> Effect<B, E>
    where
        B: Send + 'static,
    {
        self.flat_map(move |_| next)
    }

    /// Run `self`; if it succeeds, run a side-effecting action on the
    /// result without changing it.
    pub fn tap(self, f: impl FnOnce(&A) -> Result<(), E> + Send + 'static) -> Effect<A, E> {
        self.flat_map(move |a| match f(&a) {
            Ok(()) => succeed(a),
            Err(e) => fail(e),
        })
    }

    /// Run `self`; if it succeeds, also run `other` and discard its result,
    /// keeping `self`'s value. `other` never runs if `self` fails, and its
    /// own failure propagates in place of `self`'s success — distinct from
    /// `tap`, which takes a plain fallible closure rather than a full
    /// follow-on effect (spec §6's `whenSucceeds`).
    pub fn when_succeeds<B>(self, other: Effect<B, E>) -> Effect<A, E>
    where
        B: Send + 'static,
    {
        self.flat_map(move |a| other.map(move |_| a))
    }

    /// Handle only the failures `selector` matches; every other failure
    /// (including a non-matching domain error, `ServiceNotFound`, `Timeout`,
    /// or `Interrupt`) propagates unchanged (spec §4.2).
    pub fn catch(
        self,
        selector: Selector<E>,
        handler: impl FnOnce(Failure<E>) -> Effect<A, E> + Send + 'static,
    ) -> Effect<A, E> {
        let recover: BoxedRecover<E> = Box::new(move |f| handler(f).into_raw());
        Effect::from_raw(Raw::Catch(Box::new(self.raw), selector, recover))
    }

    /// Handle domain errors (`Failure::Error`) matching `pred`; everything
    /// else propagates.
    pub fn catch_error(
        self,
        pred: impl Fn(&E) -> bool + Send + Sync + 'static,
        handler: impl FnOnce(E) -> Effect<A, E> + Send + 'static,
    ) -> Effect<A, E> {
        self.catch(Selector::matching(pred), move |failure| match failure {
            Failure::Error(e) => handler(e),
            other => fail_cause(Cause::Fail(other)),
        })
    }

    /// Handle every failure, regardless of kind.
    pub fn catch_all(
        self,
        handler: impl FnOnce(Failure<E>) -> Effect<A, E> + Send + 'static,
    ) -> Effect<A, E> {
        self.catch(Selector::any(), handler)
    }

    /// If `self` fails for any reason, run `fallback` instead. Shorthand
    /// for `catch_all` that ignores the failure.
    pub fn or_else(self, fallback: impl FnOnce() -> Effect<A, E> + Send + 'static) -> Effect<A, E> {
        let f: BoxedFallback<E> = Box::new(move || fallback().into_raw());
        Effect::from_raw(Raw::OrElse(Box::new(self.raw), f))
    }

    /// Run `finalizer` after `self` completes, whether it succeeded,
    /// failed, or was interrupted. The finalizer's own failure is composed
    /// onto `self`'s outcome as a `Sequential` cause rather than masking it
    /// (spec §4.5).
    pub fn ensuring(self, finalizer: Effect<(), E>) -> Effect<A, E> {
        Effect::from_raw(Raw::Ensuring(Box::new(self.raw), Box::new(finalizer.into_raw())))
    }

    /// Bound `self`'s running time. If it doesn't complete within `d`, the
    /// result is `Failure::Timeout` and `self` is interrupted (spec §4.6).
    pub fn timeout_after(self, d: Duration) -> Effect<A, E> {
        Effect::from_raw(Raw::Timeout(Box::new(self.raw), d))
    }

    /// Run `self` with `overlay` merged on top of whatever `Context` is
    /// already active; `overlay`'s bindings win on conflict.
    pub fn provided_with(self, overlay: Context) -> Effect<A, E> {
        Effect::from_raw(Raw::ProvideContext(Box::new(self.raw), overlay))
    }

    /// Run `self` with a `Context` built by `layer` merged over the
    /// ambient one.
    pub fn provided_by_layer(self, layer: Layer<E>) -> Effect<A, E> {
        Effect::from_raw(Raw::ProvideLayer(Box::new(self.raw), layer))
    }

    /// Run an effect built from a fresh [`Scope`], closing the scope (and
    /// running its finalizers) once the body completes, regardless of
    /// outcome (spec §4.5).
    pub fn scoped(body: impl FnOnce(&Scope<E>) -> Effect<A, E> + Send + 'static) -> Effect<A, E> {
        let f: BoxedScoped<E> = Box::new(move |scope| body(scope).into_raw());
        Effect::from_raw(Raw::Scoped(f))
    }

    /// Start `self` on a separate logical fiber and return immediately
    /// with a [`Fiber`] handle rather than waiting for it to finish. The
    /// `Strategy` bound at interpretation time decides what "separate"
    /// means — eager/sequential for `SynchronousStrategy`, a real OS
    /// thread via `spawn_blocking` for `effects-tokio`'s `TokioStrategy`
    /// (spec §7).
    pub fn forked(self) -> Effect<crate::fiber::Fiber<A, E>, E> {
        let cont: BoxedContinuation<E> = Box::new(|erased: Erased| {
            let control = *erased
                .downcast::<crate::fiber::RawControl<E>>()
                .unwrap_or_else(|_| panic!("fork did not produce a RawControl"));
            Raw::Success(erase(crate::fiber::Fiber::<A, E>::from_control(control)))
        });
        Effect::from_raw(Raw::FlatMap(Box::new(Raw::Fork(Box::new(self.raw))), cont))
    }

    /// Run `self` and `other` concurrently (subject to the active
    /// `Strategy`'s concurrency model) and succeed with both results once
    /// both complete. Fails as soon as either child fails or is
    /// interrupted, folding the other's cause in alongside it — the binary
    /// counterpart to [`all_in_parallel`] (spec §6's `zipWithPar`).
    pub fn zip_with_par<B>(self, other: Effect<B, E>) -> Effect<(A, B), E>
    where
        B: Send + 'static,
    {
        let children = vec![self.raw, other.into_raw()];
        let cont: BoxedContinuation<E> = Box::new(|erased: Erased| {
            let mut values = (*erased
                .downcast::<Vec<Erased>>()
                .unwrap_or_else(|_| panic!("parallel effect did not produce a Vec<Erased>")))
            .into_iter();
            let a = unerase::<A>(values.next().expect("zip_with_par always produces two slots"));
            let b = unerase::<B>(values.next().expect("zip_with_par always produces two slots"));
            Raw::Success(erase((a, b)))
        });
        Effect::from_raw(Raw::FlatMap(Box::new(Raw::Parallel(children)), cont))
    }

    /// Run `self` and `other` concurrently; succeed with whichever finishes
    /// first and interrupt the loser. Fails only if both fail — the binary
    /// counterpart to [`race_all`] (spec §6's `raceWith`).
    pub fn race_with(self, other: Effect<A, E>) -> Effect<A, E> {
        Effect::from_raw(Raw::Race(vec![self.raw, other.into_raw()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cause::Terminal;

    fn run<A: Send + 'static, E: Clone + 'static>(eff: Effect<A, E>) -> Result<A, Terminal<E>> {
        // A minimal, non-trampolined reference evaluator used only to
        // exercise construction in these unit tests; the real stack-safe
        // interpreter lives in `effects-interpreter`.
        fn go<A: Send + 'static, E: Clone + 'static>(raw: Raw<E>) -> Result<Erased, Cause<E>> {
            match raw {
                Raw::Success(v) => Ok(v),
                Raw::Failure(c) => Err(c),
                Raw::Sync(f) => f().map_err(Cause::fail),
                Raw::Suspend(f) => go(f()),
                Raw::FlatMap(src, k) => go(*src).and_then(|v| go(k(v))),
                Raw::Catch(src, sel, recover) => match go(*src) {
                    Ok(v) => Ok(v),
                    Err(cause) => match cause {
                        Cause::Fail(f) if sel.matches(&f) => go(recover(f)),
                        other => Err(other),
                    },
                },
                Raw::OrElse(src, fallback) => go(*src).or_else(|_| go(fallback())),
                Raw::Ensuring(src, fin) => {
                    let outcome = go(*src);
                    let fin_outcome = go(*fin);
                    match (outcome, fin_outcome) {
                        (Ok(v), Ok(_)) => Ok(v),
                        (Ok(_), Err(fin_err)) => Err(fin_err),
                        (Err(e), Ok(_)) => Err(e),
                        (Err(e), Err(fin_err)) => Err(e.then(fin_err)),
                    }
                }
                Raw::Never => loop {
                    return Err(Cause::Interrupt);
                },
                other => panic!("reference evaluator does not model {}", std::any::type_name_of_val(&other)),
            }
        }
        go(eff.into_raw())
            .map(unerase)
            .map_err(|c| c.terminal())
    }

    #[test]
    fn succeed_then_map() {
        let eff: Effect<i32, String> = succeed(1).map(|n| n + 1);
        assert_eq!(run(eff), Ok(2));
    }

    #[test]
    fn flat_map_sequences_effects() {
        let eff: Effect<i32, String> = succeed(1).flat_map(|n| succeed(n + 41));
        assert_eq!(run(eff), Ok(42));
    }

    #[test]
    fn fail_short_circuits_flat_map() {
        let eff: Effect<i32, String> = fail::<i32, String>("boom".into()).flat_map(|n| succeed(n + 1));
        assert_eq!(run(eff), Err(Terminal::Failure(Failure::Error("boom".into()))));
    }

    #[test]
    fn catch_error_recovers_matching_failure() {
        let eff: Effect<i32, String> = fail::<i32, String>("boom".into())
            .catch_error(|e| e == "boom", |_| succeed(7));
        assert_eq!(run(eff), Ok(7));
    }

    #[test]
    fn catch_error_ignores_non_matching_failure() {
        let eff: Effect<i32, String> = fail::<i32, String>("other".into())
            .catch_error(|e| e == "boom", |_| succeed(7));
        assert_eq!(run(eff), Err(Terminal::Failure(Failure::Error("other".into()))));
    }

    #[test]
    fn ensuring_runs_finalizer_on_success() {
        let eff = succeed::<i32, String>(1).ensuring(succeed(()));
        assert_eq!(run(eff), Ok(1));
    }

    #[test]
    fn ensuring_composes_finalizer_failure_onto_success() {
        let eff: Effect<i32, String> = succeed(1).ensuring(fail("cleanup failed".into()));
        assert_eq!(
            run(eff),
            Err(Terminal::Failure(Failure::Error("cleanup failed".into())))
        );
    }

    #[test]
    fn or_else_runs_fallback_after_failure() {
        let eff: Effect<i32, String> = fail::<i32, String>("boom".into()).or_else(|| succeed(9));
        assert_eq!(run(eff), Ok(9));
    }

    #[test]
    fn when_succeeds_runs_follow_on_but_keeps_original_value() {
        let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let r = ran.clone();
        let eff: Effect<i32, String> = succeed::<i32, String>(1).when_succeeds(sync(move || {
            r.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok::<(), String>(())
        }));
        assert_eq!(run(eff), Ok(1));
        assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn when_succeeds_does_not_run_follow_on_after_failure() {
        let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let r = ran.clone();
        let eff: Effect<i32, String> = fail::<i32, String>("boom".into()).when_succeeds(sync(move || {
            r.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok::<(), String>(())
        }));
        assert_eq!(run(eff), Err(Terminal::Failure(Failure::Error("boom".into()))));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn from_option_none_fails_with_supplied_error() {
        let eff: Effect<i32, String> = from_option(None, || "missing".into());
        assert_eq!(run(eff), Err(Terminal::Failure(Failure::Error("missing".into()))));
    }

    #[test]
    fn from_either_lifts_both_sides() {
        let ok: Effect<i32, String> = from_either(Either::Right(3));
        let err: Effect<i32, String> = from_either(Either::Left("bad".into()));
        assert_eq!(run(ok), Ok(3));
        assert_eq!(run(err), Err(Terminal::Failure(Failure::Error("bad".into()))));
    }

    #[test]
    fn when_false_skips_the_effect() {
        let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let r = ran.clone();
        let eff: Effect<(), String> = when(false, || {
            r.store(true, std::sync::atomic::Ordering::SeqCst);
            succeed(())
        });
        assert_eq!(run(eff), Ok(()));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
    }
}
