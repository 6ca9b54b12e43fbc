//! Schedule — a purely declarative policy describing delays and a stop
//! condition, driving `Sleep`/`Retry`/`Timeout` (spec §4.3).

use std::sync::Arc;
use std::time::Duration;

/// A schedule's core decision: given the zero-based attempt index and the
/// cumulative elapsed time since the first attempt, should there be another
/// attempt, and after how long?
trait Policy: Send + Sync {
    fn next_delay(&self, attempt: u32, elapsed: Duration) -> Option<Duration>;
}

/// A stateless retry/backoff policy.
///
/// `Schedule` is immutable and reusable — the same value can drive many
/// independent retry loops. Decorators (`up_to_max_retries`,
/// `up_to_max_duration`, `with_jitter`) wrap an existing `Schedule` in a new
/// one, applied last-in-first-out around the core policy, exactly as
/// spec §4.3 describes.
#[derive(Clone)]
pub struct Schedule {
    policy: Arc<dyn Policy>,
}

impl Schedule {
    /// Allow exactly one retry after the first failure, then stop.
    /// `should_retry(n) = n < 1`, per spec §9's resolution of the `once`
    /// ambiguity in the source material.
    pub fn once() -> Self {
        Self::from_fn(|attempt, _elapsed| (attempt < 1).then_some(Duration::ZERO))
    }

    /// Retry forever with a constant delay.
    pub fn fixed_delay(delay: Duration) -> Self {
        Self::from_fn(move |_attempt, _elapsed| Some(delay))
    }

    /// `delay = base * factor^attempt`.
    pub fn exponential_backoff(base: Duration, factor: f64) -> Self {
        Self::from_fn(move |attempt, _elapsed| {
            let scaled = base.as_secs_f64() * factor.powi(attempt as i32);
            Some(Duration::from_secs_f64(scaled))
        })
    }

    /// `delay = base * fib(attempt)`, with `fib(0) = 0`, `fib(1) = 1`.
    pub fn fibonacci_backoff(base: Duration) -> Self {
        Self::from_fn(move |attempt, _elapsed| {
            Some(base.mul_f64(fibonacci(attempt) as f64))
        })
    }

    /// `delay = base * (attempt + 1)`.
    pub fn linear_backoff(base: Duration) -> Self {
        Self::from_fn(move |attempt, _elapsed| Some(base * (attempt + 1)))
    }

    /// Cap the number of retries: no further delay is yielded once
    /// `attempt >= max_retries`.
    #[must_use]
    pub fn up_to_max_retries(self, max_retries: u32) -> Self {
        Self::from_fn(move |attempt, elapsed| {
            if attempt >= max_retries {
                None
            } else {
                self.policy.next_delay(attempt, elapsed)
            }
        })
    }

    /// Cap cumulative elapsed time: no further delay is yielded once
    /// `elapsed` already reached `max_duration`.
    #[must_use]
    pub fn up_to_max_duration(self, max_duration: Duration) -> Self {
        Self::from_fn(move |attempt, elapsed| {
            if elapsed >= max_duration {
                None
            } else {
                self.policy.next_delay(attempt, elapsed)
            }
        })
    }

    /// Multiply every yielded delay by a uniform factor in
    /// `[1 - factor, 1 + factor]`. Applied last (outermost), per spec §4.3:
    /// "apply jitter last".
    #[must_use]
    pub fn with_jitter(self, factor: f64) -> Self {
        Self::from_fn(move |attempt, elapsed| {
            self.policy.next_delay(attempt, elapsed).map(|d| {
                let spread = fastrand::f64() * 2.0 * factor - factor;
                d.mul_f64((1.0 + spread).max(0.0))
            })
        })
    }

    /// Ask the schedule for the next delay given the attempt index (0-based,
    /// counting the retries already taken, not the original attempt) and the
    /// cumulative elapsed time since the first attempt. `None` means stop.
    pub fn next_delay(&self, attempt: u32, elapsed: Duration) -> Option<Duration> {
        self.policy.next_delay(attempt, elapsed)
    }

    fn from_fn(f: impl Fn(u32, Duration) -> Option<Duration> + Send + Sync + 'static) -> Self {
        struct FnPolicy<F>(F);
        impl<F: Fn(u32, Duration) -> Option<Duration> + Send + Sync> Policy for FnPolicy<F> {
            fn next_delay(&self, attempt: u32, elapsed: Duration) -> Option<Duration> {
                (self.0)(attempt, elapsed)
            }
        }
        Self {
            policy: Arc::new(FnPolicy(f)),
        }
    }
}

fn fibonacci(n: u32) -> u64 {
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 0..n {
        let next = a + b;
        a = b;
        b = next;
    }
    a
}
