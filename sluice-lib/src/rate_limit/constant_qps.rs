//! Replays buffered tasks at a constant rate.
//!
//! Built from the two primitives: submitted tasks are kept in an
//! [`EvictingRingBuffer`], and a single "pump" callback cycles through the
//! [`RateLimiter`]. Each time the pump is admitted it runs the next live task
//! and resubmits itself, so tasks are replayed round-robin, one per permit,
//! until they expire or get overwritten.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, warn};

use super::callback::FnCallback;
use super::limiter::RateLimiter;
use super::rate::Rate;
use crate::clock::Clock;
use crate::error::Result;
use crate::load_balancing::EvictingRingBuffer;
use crate::runtime::{Executor, Scheduler};

/// A task that may be run any number of times
pub type ReplayTask = Arc<dyn Fn() + Send + Sync + 'static>;

const DEFAULT_BUFFER_CAPACITY: usize = 1;
const DEFAULT_BUFFER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Dispatches buffered tasks at a steady rate, independent of how often they
/// are submitted.
///
/// # Example
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use sluice_lib::rate_limit::{ConstantQpsRateLimiter, Rate};
/// use sluice_lib::runtime::ClockedExecutor;
///
/// let clocked = Arc::new(ClockedExecutor::new());
/// let limiter = ConstantQpsRateLimiter::new(
///     clocked.clone(),
///     clocked.clone(),
///     clocked.clone(),
///     Rate::per_second(5)?,
/// )?;
///
/// let runs = Arc::new(AtomicUsize::new(0));
/// let counter = runs.clone();
/// limiter.submit(Arc::new(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// }));
///
/// clocked.run_for(Duration::from_secs(2));
/// assert_eq!(runs.load(Ordering::SeqCst), 15);
/// # Ok::<(), sluice_lib::SluiceError>(())
/// ```
pub struct ConstantQpsRateLimiter {
    inner: Arc<QpsInner>,
}

struct QpsInner {
    limiter: RateLimiter,
    buffer: EvictingRingBuffer<ReplayTask>,
    pumping: AtomicBool,
}

impl ConstantQpsRateLimiter {
    /// Create a limiter with a single-slot buffer whose entries live for a day
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        executor: Arc<dyn Executor>,
        clock: Arc<dyn Clock>,
        rate: Rate,
    ) -> Result<Self> {
        let buffer =
            EvictingRingBuffer::new(DEFAULT_BUFFER_CAPACITY, DEFAULT_BUFFER_TTL, clock.clone())?;
        Ok(Self::with_buffer(scheduler, executor, clock, rate, buffer))
    }

    pub fn with_buffer(
        scheduler: Arc<dyn Scheduler>,
        executor: Arc<dyn Executor>,
        clock: Arc<dyn Clock>,
        rate: Rate,
        buffer: EvictingRingBuffer<ReplayTask>,
    ) -> Self {
        // Only the pump ever waits, so one buffered slot is enough
        let limiter = RateLimiter::named(
            "constant-qps",
            scheduler,
            executor,
            clock,
            VecDeque::new(),
            1,
            rate,
        );
        Self { inner: Arc::new(QpsInner { limiter, buffer, pumping: AtomicBool::new(false) }) }
    }

    /// Add `task` to the replay buffer, starting dispatch if it was idle
    pub fn submit(&self, task: ReplayTask) {
        self.inner.buffer.put(task);
        QpsInner::start_pump(&self.inner);
    }

    pub fn set_rate(&self, rate: Rate) {
        self.inner.limiter.set_rate(rate);
    }

    pub fn rate(&self) -> Rate {
        self.inner.limiter.rate()
    }

    pub fn set_buffer_capacity(&self, capacity: usize) -> Result<()> {
        self.inner.buffer.set_capacity(capacity)
    }

    pub fn set_buffer_ttl(&self, ttl: Duration) -> Result<()> {
        self.inner.buffer.set_ttl(ttl)
    }

    /// Drop every buffered task immediately; dispatch stops at the next permit
    pub fn clear(&self) {
        self.inner.buffer.clear();
        debug!("Constant QPS buffer cleared");
    }

    pub fn is_dispatching(&self) -> bool {
        self.inner.pumping.load(Ordering::SeqCst)
    }
}

impl QpsInner {
    fn start_pump(inner: &Arc<Self>) {
        if !inner.pumping.swap(true, Ordering::SeqCst) {
            QpsInner::pump(inner);
        }
    }

    fn pump(inner: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(inner);
        let submitted = inner.limiter.submit(FnCallback::new(move |result| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if result.is_err() {
                inner.pumping.store(false, Ordering::SeqCst);
                return;
            }
            match inner.buffer.get() {
                Ok(task) => {
                    task();
                    QpsInner::pump(&inner);
                }
                Err(_) => {
                    inner.pumping.store(false, Ordering::SeqCst);
                    // A put may have slipped in after the failed get
                    if inner.buffer.has_live() {
                        QpsInner::start_pump(&inner);
                    }
                }
            }
        }));

        if let Err(err) = submitted {
            warn!(%err, "Constant QPS pump could not be resubmitted");
            inner.pumping.store(false, Ordering::SeqCst);
        }
    }
}
