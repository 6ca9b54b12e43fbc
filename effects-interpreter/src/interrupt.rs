//! Cooperative cancellation signal shared between a fiber and whatever
//! spawned it (`Fork`, the losing side of a `Race`, a `Timeout`'s source).
//!
//! Cancellation here is cooperative, not preemptive: setting the signal
//! wakes anything parked in [`Interrupt::park`] (used by `Never` and by the
//! trampoline's between-step check) but cannot reach into a blocking OS
//! call already in flight — a `Sync` effect doing real I/O, or a `Sleep`
//! already parked in `Clock::sleep`, runs to completion regardless. This
//! mirrors the same limitation `tokio::select!` has around blocking work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// A shared flag plus a condition variable to wake parked waiters.
pub struct Interrupt {
    flag: AtomicBool,
    mutex: Mutex<()>,
    cv: Condvar,
}

impl Interrupt {
    /// A fresh, unset interrupt signal.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            flag: AtomicBool::new(false),
            mutex: Mutex::new(()),
            cv: Condvar::new(),
        })
    }

    /// Request cancellation and wake anything parked on this signal.
    pub fn signal(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _guard = self.mutex.lock().unwrap();
        self.cv.notify_all();
    }

    /// True once `signal` has been called.
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Block the calling thread until `signal` is called.
    pub fn park(&self) {
        let guard = self.mutex.lock().unwrap();
        let _guard = self.cv.wait_while(guard, |_| !self.is_set()).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn park_returns_once_signaled() {
        let interrupt = Interrupt::new();
        let other = Arc::clone(&interrupt);
        let handle = std::thread::spawn(move || other.park());
        std::thread::sleep(Duration::from_millis(20));
        interrupt.signal();
        handle.join().unwrap();
        assert!(interrupt.is_set());
    }
}
