//! Cause — the tree that describes why an effect failed.

use std::fmt;

/// Everything that can go wrong inside the interpreter that the embedding
/// application's own error type `E` doesn't already know about.
///
/// `Failure::Error` carries the caller's domain error. The other variants
/// are interpreter-level failure modes: a service missing from [`crate::Context`],
/// or a [`crate::Effect::Timeout`] bound being exceeded.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Failure<E> {
    /// A domain error produced by `Sync`, `Failure`, or a failed `FlatMap`.
    #[error("{0}")]
    Error(E),
    /// `ServiceAccess` found no binding for the requested tag.
    #[error("service not found: {0}")]
    ServiceNotFound(&'static str),
    /// A `Timeout` effect's duration elapsed before its source completed.
    #[error("timed out")]
    Timeout,
}

/// A structured description of why an effect failed.
///
/// `Sequential` composes causes that happened one after another (e.g. a
/// primary failure followed by a finalizer failure); `Parallel` composes
/// causes that happened concurrently (e.g. two racing children that both
/// failed). Both invariants from spec §3 hold: collapsing a `Sequential`
/// chain selects the *last* leaf failure as the terminal error, and
/// `contains` is true iff any leaf matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause<E> {
    /// A single failure.
    Fail(Failure<E>),
    /// Cooperative cancellation. Not itself an `E` — there is no domain
    /// error to report, the computation was simply cut short.
    Interrupt,
    /// Causes that occurred one after another. The last entry is the
    /// terminal failure; earlier entries are context (e.g. the original
    /// failure a finalizer's failure was layered onto).
    Sequential(Vec<Cause<E>>),
    /// Causes that occurred concurrently (a failed `Race` or `Parallel`).
    Parallel(Vec<Cause<E>>),
}

/// The single error a throwing interface (`run_sync`) reports, collapsed
/// from a [`Cause`] tree. See [`Cause::terminal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal<E> {
    /// A concrete failure was found among the cause's leaves.
    Failure(Failure<E>),
    /// Every leaf was `Interrupt` — the computation was cancelled and no
    /// leaf carries a typed error to surface.
    Interrupted,
}

impl<E> Cause<E> {
    /// Construct a `Cause` from a domain error.
    pub fn fail(err: E) -> Self {
        Cause::Fail(Failure::Error(err))
    }

    /// Compose `self` followed by `next` (used by `Ensuring` to layer a
    /// finalizer's failure onto the cause it ran after).
    pub fn then(self, next: Cause<E>) -> Cause<E> {
        match (self, next) {
            (Cause::Sequential(mut a), Cause::Sequential(b)) => {
                a.extend(b);
                Cause::Sequential(a)
            }
            (Cause::Sequential(mut a), b) => {
                a.push(b);
                Cause::Sequential(a)
            }
            (a, Cause::Sequential(mut b)) => {
                b.insert(0, a);
                Cause::Sequential(b)
            }
            (a, b) => Cause::Sequential(vec![a, b]),
        }
    }

    /// Compose a set of concurrently-failed causes into one `Parallel` cause.
    pub fn parallel(causes: Vec<Cause<E>>) -> Cause<E> {
        if causes.len() == 1 {
            causes.into_iter().next().unwrap()
        } else {
            Cause::Parallel(causes)
        }
    }

    /// True iff any leaf of this cause is a `Failure::Error` and `pred`
    /// returns true for it. Used by `Catch`'s predicate-selector form.
    pub fn contains(&self, pred: impl Fn(&Failure<E>) -> bool + Copy) -> bool {
        match self {
            Cause::Fail(f) => pred(f),
            Cause::Interrupt => false,
            Cause::Sequential(cs) | Cause::Parallel(cs) => cs.iter().any(|c| c.contains(pred)),
        }
    }

    /// True iff this cause contains an `Interrupt` leaf anywhere.
    pub fn is_interrupted(&self) -> bool {
        match self {
            Cause::Interrupt => true,
            Cause::Fail(_) => false,
            Cause::Sequential(cs) | Cause::Parallel(cs) => cs.iter().any(Cause::is_interrupted),
        }
    }

    /// Transform the domain error carried by every `Failure::Error` leaf.
    pub fn map_err<E2>(self, f: impl Fn(E) -> E2 + Copy) -> Cause<E2> {
        match self {
            Cause::Fail(Failure::Error(e)) => Cause::Fail(Failure::Error(f(e))),
            Cause::Fail(Failure::ServiceNotFound(t)) => Cause::Fail(Failure::ServiceNotFound(t)),
            Cause::Fail(Failure::Timeout) => Cause::Fail(Failure::Timeout),
            Cause::Interrupt => Cause::Interrupt,
            Cause::Sequential(cs) => {
                Cause::Sequential(cs.into_iter().map(|c| c.map_err(f)).collect())
            }
            Cause::Parallel(cs) => Cause::Parallel(cs.into_iter().map(|c| c.map_err(f)).collect()),
        }
    }

    /// Collapse this cause to the single error a throwing interface reports.
    /// `Sequential` chooses its last leaf failure; `Parallel` chooses its
    /// first leaf failure (any of them is a faithful representative of "the
    /// race/parallel group failed"). A cause made entirely of `Interrupt`
    /// collapses to `Terminal::Interrupted`.
    pub fn terminal(&self) -> Terminal<E>
    where
        E: Clone,
    {
        match self {
            Cause::Fail(f) => Terminal::Failure(f.clone()),
            Cause::Interrupt => Terminal::Interrupted,
            Cause::Sequential(cs) => cs
                .iter()
                .rev()
                .find_map(|c| match c.terminal() {
                    Terminal::Failure(f) => Some(Terminal::Failure(f)),
                    Terminal::Interrupted => None,
                })
                .unwrap_or(Terminal::Interrupted),
            Cause::Parallel(cs) => cs
                .iter()
                .find_map(|c| match c.terminal() {
                    Terminal::Failure(f) => Some(Terminal::Failure(f)),
                    Terminal::Interrupted => None,
                })
                .unwrap_or(Terminal::Interrupted),
        }
    }

    /// Human-readable tree rendering, indented by nesting depth.
    pub fn pretty_print(&self) -> String
    where
        E: fmt::Display,
    {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, depth: usize)
    where
        E: fmt::Display,
    {
        let indent = "  ".repeat(depth);
        match self {
            Cause::Fail(f) => out.push_str(&format!("{indent}Fail: {f}\n")),
            Cause::Interrupt => out.push_str(&format!("{indent}Interrupt\n")),
            Cause::Sequential(cs) => {
                out.push_str(&format!("{indent}Sequential:\n"));
                for c in cs {
                    c.write_tree(out, depth + 1);
                }
            }
            Cause::Parallel(cs) => {
                out.push_str(&format!("{indent}Parallel:\n"));
                for c in cs {
                    c.write_tree(out, depth + 1);
                }
            }
        }
    }
}

impl<E: fmt::Display> fmt::Display for Terminal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::Failure(err) => write!(f, "{err}"),
            Terminal::Interrupted => write!(f, "interrupted"),
        }
    }
}
