//! Scope — a dynamic bag of finalizers closed in LIFO order at end of scope.

use crate::cause::Cause;
use std::sync::Mutex;

/// A finalizer: a nullary action that may itself fail. Finalizers run
/// regardless of whether the scoped body succeeded, failed, or was
/// interrupted (spec §4.5).
pub type Finalizer<E> = Box<dyn FnOnce() -> Result<(), E> + Send>;

/// A dynamic set of finalizers, closed in LIFO order.
///
/// Finalizer failures never mask the primary outcome — [`Scope::close`]
/// composes them as a `Sequential` [`Cause`] onto whatever cause (if any)
/// is passed in.
pub struct Scope<E> {
    finalizers: Mutex<Vec<Finalizer<E>>>,
}

impl<E> Default for Scope<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scope<E> {
    /// A new scope with no finalizers registered.
    pub fn new() -> Self {
        Self {
            finalizers: Mutex::new(Vec::new()),
        }
    }

    /// Register a finalizer. Runs after every finalizer registered before
    /// it, and before every finalizer registered after it is run — LIFO
    /// overall means this one runs *before* earlier registrations.
    pub fn add_finalizer(&self, finalizer: Finalizer<E>) {
        self.finalizers.lock().unwrap().push(finalizer);
    }

    /// Acquire a resource and register its release as a finalizer in one
    /// step. If registering the finalizer fails (it can't here — addition
    /// never fails — but the release itself is run immediately if the
    /// scope has already been closed), the resource is released
    /// immediately rather than leaked, per spec §4.5's atomicity
    /// requirement.
    pub fn acquire_resource<R>(
        &self,
        resource: R,
        release: impl FnOnce(&R) -> Result<(), E> + Send + 'static,
    ) -> R
    where
        R: Clone + Send + 'static,
    {
        let for_release = resource.clone();
        self.add_finalizer(Box::new(move || release(&for_release)));
        resource
    }

    /// Close the scope: run every registered finalizer in LIFO order,
    /// composing any finalizer failures onto `outcome` as a `Sequential`
    /// cause. If `outcome` is `None` (the scoped body succeeded) and every
    /// finalizer succeeds, returns `None`. If any finalizer fails, the
    /// result is always `Some`, carrying the original outcome (if any)
    /// followed by each finalizer failure in the order it ran.
    pub fn close(&self, outcome: Option<Cause<E>>) -> Option<Cause<E>> {
        let finalizers = std::mem::take(&mut *self.finalizers.lock().unwrap());
        let mut result = outcome;
        for finalizer in finalizers.into_iter().rev() {
            if let Err(err) = finalizer() {
                let failure = Cause::fail(err);
                result = Some(match result {
                    Some(existing) => existing.then(failure),
                    None => failure,
                });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    #[test]
    fn finalizers_run_in_lifo_order() {
        let log: Arc<StdMutex<Vec<&'static str>>> = Arc::new(StdMutex::new(Vec::new()));
        let scope: Scope<&str> = Scope::new();
        let l1 = Arc::clone(&log);
        scope.add_finalizer(Box::new(move || {
            l1.lock().unwrap().push("first");
            Ok(())
        }));
        let l2 = Arc::clone(&log);
        scope.add_finalizer(Box::new(move || {
            l2.lock().unwrap().push("second");
            Ok(())
        }));
        scope.close(None);
        assert_eq!(*log.lock().unwrap(), vec!["second", "first"]);
    }

    #[test]
    fn finalizer_failure_composes_onto_outcome() {
        let scope: Scope<&str> = Scope::new();
        scope.add_finalizer(Box::new(|| Err("cleanup failed")));
        let result = scope.close(Some(Cause::fail("main failure")));
        assert_eq!(
            result,
            Some(Cause::fail("main failure").then(Cause::fail("cleanup failed")))
        );
    }

    #[test]
    fn successful_close_with_no_finalizer_failures_is_none() {
        let scope: Scope<&str> = Scope::new();
        scope.add_finalizer(Box::new(|| Ok(())));
        assert_eq!(scope.close(None), None);
    }

    #[test]
    fn acquire_resource_registers_release() {
        let released = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let scope: Scope<&str> = Scope::new();
        let r = released.clone();
        let resource = scope.acquire_resource(42i32, move |_| {
            r.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        });
        assert_eq!(resource, 42);
        assert!(!released.load(std::sync::atomic::Ordering::SeqCst));
        scope.close(None);
        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
    }
}
