use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{Executor, Scheduler, Task};
use crate::clock::Clock;

/// Deterministic virtual-time clock, scheduler and executor in one.
///
/// Nothing runs until the owner advances time with [`run_for`](Self::run_for)
/// or [`run_until_idle`](Self::run_until_idle). Tasks due at the same instant
/// run in submission order, and tasks scheduled while running are picked up in
/// the same call if they fall due before the target time.
///
/// # Example
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
/// use sluice_lib::runtime::{ClockedExecutor, Scheduler};
///
/// let clocked = ClockedExecutor::new();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let h = hits.clone();
/// clocked.schedule(Duration::from_millis(10), Box::new(move || {
///     h.fetch_add(1, Ordering::SeqCst);
/// }));
///
/// clocked.run_for(Duration::from_millis(9));
/// assert_eq!(hits.load(Ordering::SeqCst), 0);
/// clocked.run_for(Duration::from_millis(1));
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct ClockedExecutor {
    state: Mutex<ClockedState>,
    executed: AtomicU64,
}

#[derive(Default)]
struct ClockedState {
    now: Duration,
    seq: u64,
    queue: BTreeMap<(Duration, u64), Task>,
}

impl ClockedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance virtual time by `duration`, running every task that falls due
    pub fn run_for(&self, duration: Duration) {
        let target = self.lock().now.saturating_add(duration);
        loop {
            let task = {
                let mut state = self.lock();
                let due = state.queue.first_key_value().map(|(key, _)| *key);
                match due {
                    Some(key) if key.0 <= target => {
                        state.now = state.now.max(key.0);
                        state.queue.remove(&key)
                    }
                    _ => {
                        state.now = state.now.max(target);
                        None
                    }
                }
            };
            match task {
                Some(task) => {
                    task();
                    self.executed.fetch_add(1, Ordering::SeqCst);
                }
                None => break,
            }
        }
    }

    /// Run everything due at the current instant without moving time
    pub fn run_until_idle(&self) {
        self.run_for(Duration::ZERO);
    }

    /// Number of tasks run so far
    pub fn executed_task_count(&self) -> u64 {
        self.executed.load(Ordering::SeqCst)
    }

    /// Number of tasks waiting, due or not
    pub fn queued_task_count(&self) -> usize {
        self.lock().queue.len()
    }

    fn enqueue(&self, delay: Duration, task: Task) {
        let mut state = self.lock();
        let at = state.now.saturating_add(delay);
        let seq = state.seq;
        state.seq = state.seq.wrapping_add(1);
        state.queue.insert((at, seq), task);
    }

    fn lock(&self) -> MutexGuard<'_, ClockedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for ClockedExecutor {
    fn now(&self) -> Duration {
        self.lock().now
    }
}

impl Scheduler for ClockedExecutor {
    fn schedule(&self, delay: Duration, task: Task) {
        self.enqueue(delay, task);
    }
}

impl Executor for ClockedExecutor {
    fn execute(&self, task: Task) {
        self.enqueue(Duration::ZERO, task);
    }
}
