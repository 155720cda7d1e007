//! Completion callbacks and the queue that buffers them.

use std::collections::VecDeque;
use tokio::sync::oneshot;

use crate::error::AdmissionError;

/// Receives the outcome of a submission.
///
/// Exactly one of the two methods is invoked, at most once, and always from
/// the limiter's executor rather than the submitting thread.
pub trait Callback: Send + 'static {
    fn on_success(self: Box<Self>);
    fn on_error(self: Box<Self>, error: AdmissionError);
}

pub type BoxCallback = Box<dyn Callback>;

/// Adapts a closure taking the admission result into a [`Callback`]
pub struct FnCallback<F>(F);

impl<F> FnCallback<F>
where
    F: FnOnce(Result<(), AdmissionError>) + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Callback for FnCallback<F>
where
    F: FnOnce(Result<(), AdmissionError>) + Send + 'static,
{
    fn on_success(self: Box<Self>) {
        (self.0)(Ok(()))
    }

    fn on_error(self: Box<Self>, error: AdmissionError) {
        (self.0)(Err(error))
    }
}

impl Callback for oneshot::Sender<Result<(), AdmissionError>> {
    fn on_success(self: Box<Self>) {
        // The receiver may have given up waiting
        let _ = self.send(Ok(()));
    }

    fn on_error(self: Box<Self>, error: AdmissionError) {
        let _ = self.send(Err(error));
    }
}

/// FIFO backing store for callbacks waiting on a permit
pub trait CallbackQueue: Send + 'static {
    fn push(&mut self, callback: BoxCallback);

    fn pop(&mut self) -> Option<BoxCallback>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every callback, oldest first
    fn drain_all(&mut self) -> Vec<BoxCallback> {
        let mut drained = Vec::with_capacity(self.len());
        while let Some(callback) = self.pop() {
            drained.push(callback);
        }
        drained
    }
}

impl CallbackQueue for VecDeque<BoxCallback> {
    fn push(&mut self, callback: BoxCallback) {
        self.push_back(callback);
    }

    fn pop(&mut self) -> Option<BoxCallback> {
        self.pop_front()
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn drain_all(&mut self) -> Vec<BoxCallback> {
        self.drain(..).collect()
    }
}
