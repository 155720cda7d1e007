//! Smoothing rate limiter with a bounded FIFO of waiting callbacks.

use arc_swap::ArcSwapOption;
use opentelemetry::KeyValue;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, trace, warn};

use super::callback::{BoxCallback, Callback, CallbackQueue};
use super::rate::Rate;
use crate::clock::Clock;
use crate::config::RateLimitConfig;
use crate::error::{AdmissionError, Result};
use crate::runtime::{Executor, Scheduler};
use crate::telemetry::metrics::labels;
use crate::telemetry::Metrics;

/// Minimum spacing between two "buffer is full" warnings of one limiter
pub const REJECTION_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Admits submitted callbacks at a configurable, smoothed rate.
///
/// Permits are issued `rate.events()` at a time every `rate.period()` by a
/// task registered on the [`Scheduler`]. A submission that finds a permit is
/// dispatched right away; otherwise it waits in FIFO order until a later
/// replenishment, or is rejected when `max_buffered` callbacks are already
/// waiting. Callbacks always run on the [`Executor`], never on the submitting
/// thread nor on the scheduler. Callbacks admitted together run in FIFO order
/// within one executor task; a panic in one of them is logged and the rest
/// still complete.
///
/// Unused permits carry over up to [`Rate::max_permits`]. With a limited burst
/// an idle limiter banks up to `burst` permits. With [`Burst::Unlimited`] it
/// never holds more than one period's `events`, so idling does not bank
/// anything beyond a single replenishment.
///
/// [`Burst::Unlimited`]: super::Burst::Unlimited
///
/// The permit count, the active rate and the queue live behind a single lock
/// so checking and consuming a permit can never interleave with a
/// replenishment or a rate change.
///
/// # Example
/// ```
/// use std::collections::VecDeque;
/// use std::sync::Arc;
/// use std::time::Duration;
/// use sluice_lib::rate_limit::{Burst, FnCallback, Rate, RateLimiter};
/// use sluice_lib::runtime::ClockedExecutor;
///
/// let clocked = Arc::new(ClockedExecutor::new());
/// let limiter = RateLimiter::new(
///     clocked.clone(),
///     clocked.clone(),
///     clocked.clone(),
///     VecDeque::new(),
///     16,
///     Rate::new(1, Duration::from_millis(10), Burst::Unlimited)?,
/// );
///
/// limiter.submit(FnCallback::new(|result| assert!(result.is_ok())))?;
/// clocked.run_until_idle();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RateLimiter<Q: CallbackQueue = VecDeque<BoxCallback>> {
    inner: Arc<Inner<Q>>,
}

struct Inner<Q: CallbackQueue> {
    name: String,
    scheduler: Arc<dyn Scheduler>,
    executor: Arc<dyn Executor>,
    clock: Arc<dyn Clock>,
    max_buffered: usize,
    metrics: ArcSwapOption<Metrics>,
    state: Mutex<LimiterState<Q>>,
}

struct LimiterState<Q> {
    rate: Rate,
    permits: u64,
    pending: Q,
    last_grant: Duration,
    // Bumped on every rate change; a replenishment tick from an older
    // generation retires instead of running.
    generation: u64,
    rejections: RejectionLog,
}

/// Throttles the buffer-full warning to one per [`REJECTION_LOG_INTERVAL`]
#[derive(Debug, Default)]
struct RejectionLog {
    last_warned: Option<Duration>,
    suppressed: u64,
}

impl RejectionLog {
    /// Record a rejection at `now`. Returns the number of rejections left
    /// unlogged since the previous warning when a new warning is due.
    fn on_rejection(&mut self, now: Duration) -> Option<u64> {
        let due = self
            .last_warned
            .map_or(true, |last| now.saturating_sub(last) >= REJECTION_LOG_INTERVAL);
        if !due {
            self.suppressed = self.suppressed.saturating_add(1);
            return None;
        }
        self.last_warned = Some(now);
        Some(std::mem::take(&mut self.suppressed))
    }
}

impl RateLimiter<VecDeque<BoxCallback>> {
    /// Build a limiter from configuration with an unbounded-capacity `VecDeque` queue
    pub fn from_config(
        config: &RateLimitConfig,
        scheduler: Arc<dyn Scheduler>,
        executor: Arc<dyn Executor>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let rate = config.rate()?;
        Ok(Self::start(
            config.name.clone(),
            scheduler,
            executor,
            clock,
            VecDeque::new(),
            config.max_buffered,
            rate,
        ))
    }
}

impl<Q: CallbackQueue> RateLimiter<Q> {
    /// Create a limiter and start its replenishment task.
    ///
    /// `rate.events()` permits are available immediately so a submission made
    /// before the first tick is not forced to wait a full period.
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        executor: Arc<dyn Executor>,
        clock: Arc<dyn Clock>,
        pending: Q,
        max_buffered: usize,
        rate: Rate,
    ) -> Self {
        Self::start("default".to_string(), scheduler, executor, clock, pending, max_buffered, rate)
    }

    /// Same as [`new`](Self::new), with a name used in logs and metric labels
    #[allow(clippy::too_many_arguments)]
    pub fn named(
        name: impl Into<String>,
        scheduler: Arc<dyn Scheduler>,
        executor: Arc<dyn Executor>,
        clock: Arc<dyn Clock>,
        pending: Q,
        max_buffered: usize,
        rate: Rate,
    ) -> Self {
        Self::start(name.into(), scheduler, executor, clock, pending, max_buffered, rate)
    }

    #[allow(clippy::too_many_arguments)]
    fn start(
        name: String,
        scheduler: Arc<dyn Scheduler>,
        executor: Arc<dyn Executor>,
        clock: Arc<dyn Clock>,
        pending: Q,
        max_buffered: usize,
        rate: Rate,
    ) -> Self {
        let now = clock.now();
        let inner = Arc::new(Inner {
            name,
            scheduler,
            executor,
            clock,
            max_buffered,
            metrics: ArcSwapOption::empty(),
            state: Mutex::new(LimiterState {
                rate,
                permits: u64::from(rate.events()),
                pending,
                last_grant: now,
                generation: 0,
                rejections: RejectionLog::default(),
            }),
        });
        Inner::schedule_replenish(&inner, 0, rate.period());
        Self { inner }
    }

    /// Attach (or replace) the metrics this limiter records into
    pub fn set_metrics(&self, metrics: Arc<Metrics>) {
        self.inner.metrics.store(Some(metrics));
    }

    /// Request admission for `callback`.
    ///
    /// Never blocks. Returns `Err(AdmissionError::Rejected)` without invoking
    /// the callback when no permit is available and the buffer is full.
    pub fn submit<C: Callback>(&self, callback: C) -> std::result::Result<(), AdmissionError> {
        self.submit_boxed(Box::new(callback))
    }

    pub fn submit_boxed(&self, callback: BoxCallback) -> std::result::Result<(), AdmissionError> {
        let inner = &self.inner;
        let mut state = inner.lock();

        if state.pending.is_empty() && state.permits > 0 {
            state.permits -= 1;
            drop(state);
            inner.record(|m, attrs| m.admitted_total.add(1, attrs));
            inner.dispatch(vec![callback]);
            return Ok(());
        }

        if state.pending.len() >= inner.max_buffered {
            let warn_due = state.rejections.on_rejection(inner.clock.now());
            drop(state);
            inner.record(|m, attrs| m.rejected_total.add(1, attrs));
            if let Some(suppressed) = warn_due {
                warn!(
                    limiter = %inner.name,
                    max_buffered = inner.max_buffered,
                    suppressed,
                    "Rate limiter buffer is full, rejecting callback"
                );
            }
            return Err(AdmissionError::Rejected { max_buffered: inner.max_buffered });
        }

        state.pending.push(callback);
        drop(state);
        inner.record(|m, attrs| m.queued_total.add(1, attrs));
        Ok(())
    }

    /// Wait for admission.
    ///
    /// Resolves once a permit is granted, or with the error the callback
    /// would have received.
    pub async fn acquire(&self) -> std::result::Result<(), AdmissionError> {
        let (tx, rx) = oneshot::channel();
        self.submit(tx)?;
        rx.await.unwrap_or(Err(AdmissionError::Abandoned))
    }

    /// Replace the active rate.
    ///
    /// Banked permits and queued callbacks are kept. The next replenishment is
    /// rescheduled to one new period after the last grant (immediately if that
    /// moment has already passed) and issues the new `events`.
    pub fn set_rate(&self, rate: Rate) {
        let inner = &self.inner;
        let (generation, delay) = {
            let mut state = inner.lock();
            state.rate = rate;
            state.generation = state.generation.wrapping_add(1);
            let next = state.last_grant.saturating_add(rate.period());
            (state.generation, next.saturating_sub(inner.clock.now()))
        };
        inner.record(|m, attrs| m.rate_changes_total.add(1, attrs));
        debug!(limiter = %inner.name, %rate, ?delay, "Rate limiter rate updated");
        Inner::schedule_replenish(inner, generation, delay);
    }

    /// Fail every waiting callback with `cause`, oldest first.
    ///
    /// Callbacks already dispatched are unaffected. Calling this again while
    /// nothing is waiting does nothing.
    pub fn cancel_all<E>(&self, cause: E)
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let inner = &self.inner;
        let drained = inner.lock().pending.drain_all();
        if drained.is_empty() {
            debug!(limiter = %inner.name, "cancel_all found no pending callbacks");
            return;
        }

        let count = drained.len();
        inner.record(|m, attrs| m.cancelled_total.add(count as u64, attrs));
        debug!(limiter = %inner.name, count, "Cancelling pending callbacks");

        let error = AdmissionError::Cancelled(Arc::new(cause));
        let name = inner.name.clone();
        inner.executor.execute(Box::new(move || {
            for callback in drained {
                let error = error.clone();
                complete(&name, move || callback.on_error(error));
            }
        }));
    }

    pub fn rate(&self) -> Rate {
        self.inner.lock().rate
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn available_permits(&self) -> u64 {
        self.inner.lock().permits
    }

    pub fn max_buffered(&self) -> usize {
        self.inner.max_buffered
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl<Q: CallbackQueue> Inner<Q> {
    fn lock(&self) -> MutexGuard<'_, LimiterState<Q>> {
        // Every critical section leaves the state consistent
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn schedule_replenish(inner: &Arc<Self>, generation: u64, delay: Duration) {
        let weak: Weak<Self> = Arc::downgrade(inner);
        inner.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Inner::replenish(&inner, generation);
                }
            }),
        );
    }

    fn replenish(inner: &Arc<Self>, generation: u64) {
        let (ready, period) = {
            let mut state = inner.lock();
            if state.generation != generation {
                return;
            }
            let rate = state.rate;
            state.last_grant = inner.clock.now();
            state.permits =
                state.permits.saturating_add(u64::from(rate.events())).min(rate.max_permits());

            let mut ready = Vec::new();
            while state.permits > 0 {
                match state.pending.pop() {
                    Some(callback) => {
                        state.permits -= 1;
                        ready.push(callback);
                    }
                    None => break,
                }
            }
            (ready, rate.period())
        };

        trace!(limiter = %inner.name, dispatched = ready.len(), "Permits replenished");
        inner.record(|m, attrs| m.replenishments_total.add(1, attrs));
        if !ready.is_empty() {
            let count = ready.len() as u64;
            inner.record(|m, attrs| m.admitted_total.add(count, attrs));
            inner.dispatch(ready);
        }
        Inner::schedule_replenish(inner, generation, period);
    }

    fn dispatch(&self, callbacks: Vec<BoxCallback>) {
        // One task keeps the batch in FIFO order on any executor
        let name = self.name.clone();
        self.executor.execute(Box::new(move || {
            for callback in callbacks {
                complete(&name, move || callback.on_success());
            }
        }));
    }

    fn record(&self, f: impl FnOnce(&Metrics, &[KeyValue])) {
        if let Some(metrics) = self.metrics.load().as_ref() {
            f(metrics, &[KeyValue::new(labels::LIMITER, self.name.clone())]);
        }
    }
}

impl<Q: CallbackQueue> Drop for Inner<Q> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        let abandoned = state.pending.drain_all();
        if abandoned.is_empty() {
            return;
        }
        debug!(limiter = %self.name, count = abandoned.len(), "Rate limiter dropped with pending callbacks");

        let name = self.name.clone();
        self.executor.execute(Box::new(move || {
            for callback in abandoned {
                complete(&name, move || callback.on_error(AdmissionError::Abandoned));
            }
        }));
    }
}

/// Run one callback. A panic is contained and logged so the rest of its batch
/// still completes.
fn complete(limiter: &str, invoke: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(invoke)).is_err() {
        error!(limiter, "Rate limiter callback panicked");
    }
}
