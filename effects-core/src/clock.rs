//! Clock — wall time, monotonic time, and a cooperative, blocking sleep.
//!
//! Two implementations, per spec §2.3: [`SystemClock`] (real time, blocking
//! OS sleep) and [`VirtualClock`] (explicitly advanced, for deterministic
//! tests). `Strategy::sleep` (see `effects-interpreter`) delegates to
//! whichever `Clock` is bound in the active `Context`.

use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Wall time, monotonic time, and a cooperative sleep.
///
/// `sleep` blocks the calling thread until `d` has elapsed according to
/// this clock. For [`SystemClock`] that's a real OS sleep; for
/// [`VirtualClock`] it's a condition-variable wait released only by an
/// explicit [`VirtualClock::advance`] call from another thread — the OS
/// sleep is never invoked, satisfying spec testable property #6.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch (or since the virtual clock's
    /// epoch, for `VirtualClock`).
    fn now_millis(&self) -> u64;

    /// A monotonic instant, usable only for measuring elapsed durations
    /// (never for wall-clock display).
    fn monotonic(&self) -> Duration;

    /// Block the calling thread until `d` has elapsed on this clock.
    fn sleep(&self, d: Duration);
}

/// Real wall-clock time; `sleep` is a genuine (blocking) OS sleep.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn monotonic(&self) -> Duration {
        // Relative to the process start would require a `OnceLock`; an
        // `Instant` offset from an internal epoch is simplest and is never
        // compared across clock instances.
        static EPOCH: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
        EPOCH.get_or_init(Instant::now).elapsed()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

struct Waiter {
    deadline: Duration,
    seq: u64,
}
impl PartialEq for Waiter {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}
impl Eq for Waiter {}
impl Ord for Waiter {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse so `BinaryHeap` (a max-heap) pops the earliest deadline first.
        other.deadline.cmp(&self.deadline).then(other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for Waiter {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct VirtualClockState {
    now: Duration,
    pending: BinaryHeap<Waiter>,
    next_seq: u64,
}

/// An explicitly-advanced clock for deterministic tests.
///
/// `sleep` parks the calling thread on a condition variable until `advance`
/// (called from another thread — typically the test driver) moves virtual
/// time past the sleeper's deadline. Multiple concurrent sleepers (e.g. the
/// children of a `Race`) wake in deadline order as `advance` steps past
/// each one.
pub struct VirtualClock {
    state: Mutex<VirtualClockState>,
    cv: Condvar,
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualClock {
    /// A new virtual clock starting at virtual time zero.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(VirtualClockState {
                now: Duration::ZERO,
                pending: BinaryHeap::new(),
                next_seq: 0,
            }),
            cv: Condvar::new(),
        }
    }

    /// Move virtual time forward by `d`, waking any sleeper whose deadline
    /// has now passed.
    pub fn advance(&self, d: Duration) {
        let mut state = self.state.lock().unwrap();
        state.now += d;
        self.cv.notify_all();
    }

    /// Move virtual time forward to exactly the next pending sleeper's
    /// deadline, or do nothing if there are no pending sleepers. Returns
    /// the amount of time advanced, if any. A convenience for tests that
    /// want to drain pending timers without picking arbitrary durations.
    pub fn advance_to_next_wakeup(&self) -> Option<Duration> {
        let mut state = self.state.lock().unwrap();
        let target = state.pending.peek()?.deadline;
        let delta = target.saturating_sub(state.now);
        state.now = target;
        self.cv.notify_all();
        Some(delta)
    }

    /// Current virtual time.
    pub fn current(&self) -> Duration {
        self.state.lock().unwrap().now
    }
}

impl Clock for VirtualClock {
    fn now_millis(&self) -> u64 {
        self.current().as_millis() as u64
    }

    fn monotonic(&self) -> Duration {
        self.current()
    }

    fn sleep(&self, d: Duration) {
        let mut state = self.state.lock().unwrap();
        let seq = state.next_seq;
        state.next_seq += 1;
        let deadline = state.now + d;
        state.pending.push(Waiter { deadline, seq });
        state = self
            .cv
            .wait_while(state, |s| s.now < deadline)
            .unwrap();
        state.pending.retain(|w| w.seq != seq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn virtual_clock_advance_wakes_sleeper() {
        let clock = Arc::new(VirtualClock::new());
        let c2 = Arc::clone(&clock);
        let handle = std::thread::spawn(move || {
            c2.sleep(Duration::from_millis(10));
            c2.current()
        });
        // Give the sleeper a moment to register, then advance past it.
        std::thread::sleep(Duration::from_millis(20));
        clock.advance(Duration::from_millis(10));
        let woke_at = handle.join().unwrap();
        assert_eq!(woke_at, Duration::from_millis(10));
    }

    #[test]
    fn virtual_clock_never_blocks_past_its_own_thread() {
        // sleep(0) should return immediately without any advance.
        let clock = VirtualClock::new();
        clock.sleep(Duration::ZERO);
        assert_eq!(clock.current(), Duration::ZERO);
    }

    #[test]
    fn advance_to_next_wakeup_jumps_to_earliest_deadline() {
        let clock = Arc::new(VirtualClock::new());
        let c2 = Arc::clone(&clock);
        let c3 = Arc::clone(&clock);
        let short = std::thread::spawn(move || c2.sleep(Duration::from_millis(5)));
        let long = std::thread::spawn(move || c3.sleep(Duration::from_millis(20)));
        std::thread::sleep(Duration::from_millis(20));
        let advanced = clock.advance_to_next_wakeup().unwrap();
        assert_eq!(advanced, Duration::from_millis(5));
        short.join().unwrap();
        clock.advance(Duration::from_millis(15));
        long.join().unwrap();
    }
}
