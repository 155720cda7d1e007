//! Scheduling and dispatch abstractions.
//!
//! The rate limiter never spawns threads itself. Permit replenishment is
//! registered on a [`Scheduler`] and callbacks are handed to an [`Executor`],
//! so the two can be backed by a tokio runtime in production and by a
//! [`ClockedExecutor`] in tests.

mod clocked;
mod tokio_runtime;

pub use clocked::ClockedExecutor;
pub use tokio_runtime::{TokioExecutor, TokioScheduler};

use std::time::Duration;

/// A unit of work handed to a scheduler or executor
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks after a delay
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task);
}

/// Runs tasks as soon as possible, off the submitting thread
pub trait Executor: Send + Sync {
    fn execute(&self, task: Task);
}

/// Executor that runs every task on the dispatching thread.
///
/// Useful for benches and tests that want callbacks to complete before
/// `submit` returns. Production code should prefer [`TokioExecutor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}
