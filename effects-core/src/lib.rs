//! Data model for a pluggable effect interpreter: the [`Effect`] algebra
//! itself, the [`Cause`] tree that describes failure, [`Context`]/[`Layer`]
//! dependency injection, [`Schedule`] retry policies, the [`Clock`]
//! abstraction, and [`Scope`] finalizers.
//!
//! This crate defines *what* an effect is; it does not know how to run
//! one. `effects-interpreter` walks the tree defined here with a
//! stack-safe trampoline, dispatching concurrency-sensitive nodes (`Fork`,
//! `Race`, `Parallel`) to a pluggable `Strategy`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cause;
mod clock;
mod context;
mod effect;
mod either;
mod fiber;
mod layer;
mod schedule;
mod scope;

pub use cause::{Cause, Failure, Terminal};
pub use clock::{Clock, SystemClock, VirtualClock};
pub use context::{Context, Tag};
pub use effect::{
    all_in_parallel, current_time_millis, fail, fail_cause, from_either, from_option, never,
    race_all, retry, service, succeed, suspend, sync, sleep_for, when, Effect, Erased, Selector,
};
pub use either::Either;
pub use fiber::Fiber;
pub use layer::Layer;
pub use schedule::Schedule;
pub use scope::{Finalizer, Scope};

/// Type-erased tree walked by `effects-interpreter`. Not part of the
/// stable public API for ordinary callers building effects.
#[doc(hidden)]
#[allow(missing_docs)]
pub mod internal {
    pub use crate::effect::Raw;
    pub use crate::fiber::RawControl;
}
