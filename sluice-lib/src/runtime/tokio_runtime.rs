use std::time::Duration;
use tokio::runtime::Handle;

use super::{Executor, Scheduler, Task};
use crate::error::{Result, SluiceError};

/// [`Scheduler`] backed by tokio timers
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime of the calling context
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| SluiceError::Runtime(format!("No tokio runtime available: {e}")))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        self.handle.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task();
        });
    }
}

/// [`Executor`] that runs tasks on tokio's blocking pool.
///
/// Callbacks are plain closures and may block; running them on the blocking
/// pool keeps them off the runtime workers that drive replenishment.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| SluiceError::Runtime(format!("No tokio runtime available: {e}")))
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: Task) {
        // Detached: the callback reports its own outcome
        drop(self.handle.spawn_blocking(task));
    }
}
