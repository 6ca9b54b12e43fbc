//! The trampoline: walks a type-erased effect tree without growing the
//! host call stack in proportion to the tree's depth (spec §6, testable
//! property #1).
//!
//! `FlatMap`/`Catch`/`OrElse`/`ProvideContext`/`ProvideLayer` nodes push a
//! [`Frame`] onto an explicit, heap-allocated stack instead of recursing.
//! `Ensuring`, `Fork`, `Race`, `Parallel`, `Timeout`, `Retry`, and `Scoped`
//! do recurse through [`run_erased`] — but each such recursion corresponds
//! to a genuinely distinct unit of work (a finalizer, a fresh fiber, a
//! retry attempt), not another link in a single sequential chain, so its
//! depth is bounded by how much real concurrency or looping the program
//! asks for rather than by chain length.

use crate::interrupt::Interrupt;
use crate::strategy::{Strategy, Task};
use effects_core::internal::Raw;
use effects_core::{Cause, Context, Erased, Failure, Schedule, Selector};
use std::sync::Arc;

type BoxedContinuation<E> = Box<dyn FnOnce(Erased) -> Raw<E> + Send>;
type BoxedRecover<E> = Box<dyn FnOnce(Failure<E>) -> Raw<E> + Send>;
type BoxedFallback<E> = Box<dyn FnOnce() -> Raw<E> + Send>;

enum Frame<E> {
    FlatMap(BoxedContinuation<E>),
    Catch(Selector<E>, BoxedRecover<E>),
    OrElse(BoxedFallback<E>),
    RestoreContext(Context),
}

enum Resumed<E> {
    Continue(Raw<E>),
    Done(Result<Erased, Cause<E>>),
}

/// Interpret `root` under `ctx`, dispatching concurrency-sensitive nodes to
/// `strategy`. `interrupt` lets an enclosing `Race`/`Timeout`/`fork` cancel
/// this interpretation cooperatively; pass a fresh [`Interrupt`] for a
/// top-level run.
pub fn run_erased<E: Send + 'static>(
    root: Raw<E>,
    ctx: &Context,
    strategy: &dyn Strategy<E>,
    interrupt: &Arc<Interrupt>,
) -> Result<Erased, Cause<E>> {
    let mut current = root;
    let mut stack: Vec<Frame<E>> = Vec::new();
    let mut ctx = ctx.clone();

    loop {
        if interrupt.is_set() {
            return Err(Cause::Interrupt);
        }

        let outcome: Result<Erased, Cause<E>> = match current {
            Raw::Success(v) => Ok(v),
            Raw::Failure(cause) => Err(cause),
            Raw::Sync(f) => f().map_err(Cause::fail),
            Raw::Suspend(f) => {
                current = f();
                continue;
            }
            Raw::Never => {
                interrupt.park();
                Err(Cause::Interrupt)
            }
            Raw::Sleep(d) => {
                strategy.clock().sleep(d);
                Ok(Box::new(()))
            }
            Raw::CurrentTime => Ok(Box::new(strategy.clock().now_millis())),
            Raw::FlatMap(src, k) => {
                stack.push(Frame::FlatMap(k));
                current = *src;
                continue;
            }
            Raw::Catch(src, sel, recover) => {
                stack.push(Frame::Catch(sel, recover));
                current = *src;
                continue;
            }
            Raw::OrElse(src, fallback) => {
                stack.push(Frame::OrElse(fallback));
                current = *src;
                continue;
            }
            Raw::Ensuring(src, finalizer) => {
                let primary = run_erased(*src, &ctx, strategy, interrupt);
                let finalizer_outcome = run_erased(*finalizer, &ctx, strategy, interrupt);
                match (primary, finalizer_outcome) {
                    (Ok(v), Ok(_)) => Ok(v),
                    (Ok(_), Err(fin_cause)) => Err(fin_cause),
                    (Err(cause), Ok(_)) => Err(cause),
                    (Err(cause), Err(fin_cause)) => Err(cause.then(fin_cause)),
                }
            }
            Raw::Timeout(src, d) => {
                tracing::debug!(millis = d.as_millis() as u64, "effect.timeout.start");
                let task = Task::new(*src, ctx.clone(), Arc::clone(interrupt));
                let outcome = strategy.run_with_timeout(task, d);
                if outcome.is_err() {
                    tracing::debug!(millis = d.as_millis() as u64, "effect.timeout.exceeded");
                }
                outcome
            }
            Raw::Retry(factory, schedule) => run_retry(&factory, &schedule, &ctx, strategy, interrupt),
            Raw::Race(children) => {
                tracing::debug!(count = children.len(), "effect.race.start");
                let tasks = children
                    .into_iter()
                    .map(|child| Task::new(child, ctx.clone(), Interrupt::new()))
                    .collect();
                strategy.race(tasks)
            }
            Raw::Parallel(children) => {
                tracing::debug!(count = children.len(), "effect.parallel.start");
                let tasks = children
                    .into_iter()
                    .map(|child| Task::new(child, ctx.clone(), Interrupt::new()))
                    .collect();
                strategy.parallel(tasks).map(|values| Box::new(values) as Erased)
            }
            Raw::Fork(child) => {
                tracing::debug!("effect.fork.start");
                let child_interrupt = Interrupt::new();
                let task = Task::new(*child, ctx.clone(), child_interrupt);
                let control = strategy.fork(task);
                Ok(Box::new(control) as Erased)
            }
            Raw::ServiceAccess(lookup) => lookup(&ctx)
                .map_err(Failure::ServiceNotFound)
                .map_err(Cause::Fail),
            Raw::ProvideContext(src, overlay) => {
                stack.push(Frame::RestoreContext(ctx.clone()));
                ctx = ctx.merge(&overlay);
                current = *src;
                continue;
            }
            Raw::ProvideLayer(src, layer) => {
                match run_erased(layer.build().into_raw(), &ctx, strategy, interrupt) {
                    Ok(erased) => {
                        let built_ctx: Context = *erased
                            .downcast::<Context>()
                            .unwrap_or_else(|_| panic!("layer build produced a non-Context value"));
                        stack.push(Frame::RestoreContext(ctx.clone()));
                        ctx = ctx.merge(&built_ctx);
                        current = *src;
                        continue;
                    }
                    Err(cause) => Err(cause),
                }
            }
            Raw::Scoped(body) => {
                let scope = effects_core::Scope::new();
                let child = body(&scope);
                match run_erased(child, &ctx, strategy, interrupt) {
                    Ok(v) => match scope.close(None) {
                        None => Ok(v),
                        Some(cause) => Err(cause),
                    },
                    Err(cause) => {
                        let closed = scope
                            .close(Some(cause))
                            .expect("close always returns Some when given an outcome");
                        Err(closed)
                    }
                }
            }
        };

        match resume(&mut stack, &mut ctx, outcome) {
            Resumed::Continue(next) => current = next,
            Resumed::Done(result) => return result,
        }
    }
}

fn resume<E: Send + 'static>(
    stack: &mut Vec<Frame<E>>,
    ctx: &mut Context,
    mut outcome: Result<Erased, Cause<E>>,
) -> Resumed<E> {
    loop {
        let Some(frame) = stack.pop() else {
            return Resumed::Done(outcome);
        };
        outcome = match (frame, outcome) {
            (Frame::FlatMap(k), Ok(v)) => return Resumed::Continue(k(v)),
            (Frame::FlatMap(_), err) => err,
            (Frame::Catch(selector, recover), Err(cause)) => match cause {
                Cause::Fail(f) if selector.matches(&f) => return Resumed::Continue(recover(f)),
                other => Err(other),
            },
            (Frame::Catch(_, _), ok) => ok,
            (Frame::OrElse(fallback), Err(_)) => return Resumed::Continue(fallback()),
            (Frame::OrElse(_), ok) => ok,
            (Frame::RestoreContext(previous), outcome) => {
                *ctx = previous;
                outcome
            }
        };
    }
}

/// Run the effect `factory` produces, retrying per `schedule` whenever it
/// fails with a domain error. Interruption and interpreter-level failures
/// (`ServiceNotFound`, `Timeout`) are never retried (spec §4.3).
fn run_retry<E: Send + 'static>(
    factory: &(dyn Fn() -> Raw<E> + Send + Sync),
    schedule: &Schedule,
    ctx: &Context,
    strategy: &dyn Strategy<E>,
    interrupt: &Arc<Interrupt>,
) -> Result<Erased, Cause<E>> {
    let start = strategy.clock().monotonic();
    let mut attempt = 0u32;
    loop {
        match run_erased(factory(), ctx, strategy, interrupt) {
            Ok(v) => return Ok(v),
            Err(cause) => {
                let is_domain_error = cause.contains(|f| matches!(f, Failure::Error(_)));
                if !is_domain_error || cause.is_interrupted() {
                    return Err(cause);
                }
                let elapsed = strategy.clock().monotonic().saturating_sub(start);
                match schedule.next_delay(attempt, elapsed) {
                    Some(delay) => {
                        tracing::debug!(
                            attempt,
                            delay_millis = delay.as_millis() as u64,
                            "effect.retry.scheduled"
                        );
                        strategy.clock().sleep(delay);
                        attempt += 1;
                    }
                    None => {
                        tracing::debug!(attempt, "effect.retry.exhausted");
                        return Err(cause);
                    }
                }
            }
        }
    }
}
