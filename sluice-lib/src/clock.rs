//! Time sources injected into the rate limiter and the ring buffer.
//!
//! Every component reads time through [`Clock`] so tests can drive it
//! deterministically with a [`SettableClock`] (or a
//! [`ClockedExecutor`](crate::runtime::ClockedExecutor)) instead of sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic time source.
///
/// `now` reports the time elapsed since the clock's origin. Only differences
/// between two readings of the same clock are meaningful.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Wall clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct SettableClock {
    nanos: AtomicU64,
}

impl SettableClock {
    pub fn new(start: Duration) -> Self {
        Self { nanos: AtomicU64::new(to_nanos(start)) }
    }

    pub fn set(&self, now: Duration) {
        self.nanos.store(to_nanos(now), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = to_nanos(by);
        // fetch_update never fails with a closure that always returns Some
        let _ = self
            .nanos
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_add(by)));
    }
}

impl Clock for SettableClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

fn to_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
